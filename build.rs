// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("manifold")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Manifold Contributors")
        .about("Package manifest updater with installer introspection")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Enable debug logging"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Configuration file (TOML)"),
        )
        .subcommand(
            Command::new("update")
                .about("Build the manifest set of a new package version")
                .arg(
                    Arg::new("manifests")
                        .short('m')
                        .long("manifests")
                        .value_name("DIR")
                        .required(true)
                        .help("Directory holding the current manifest set"),
                )
                .arg(
                    Arg::new("instructions")
                        .short('i')
                        .long("instructions")
                        .value_name("FILE")
                        .required(true)
                        .help("Update instructions (YAML or JSON)"),
                )
                .arg(
                    Arg::new("package_version")
                        .long("version")
                        .value_name("VERSION")
                        .required(true)
                        .help("New package version"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .help("Output directory (default: overwrite the input directory)"),
                ),
        )
        .subcommand(
            Command::new("burn")
                .about("Show metadata and identity of a WiX Burn bundle")
                .arg(Arg::new("path").required(true).help("Path to the bundle executable"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print JSON instead of text"),
                ),
        )
        .subcommand(
            Command::new("msix")
                .about("Show identity, family name and signature hash of an MSIX/APPX package")
                .arg(Arg::new("path").required(true).help("Path to the package"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print JSON instead of text"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(Arg::new("shell").required(true).help("Shell to generate completions for")),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("manifold.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
