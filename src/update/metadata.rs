// src/update/metadata.rs

//! Binary installer metadata
//!
//! After an entry has been applied, the installer file itself is the
//! authority for its hash, product code and Apps & Features facts. MSI and
//! Burn extraction failures are fatal when a field would silently go stale;
//! MSIX extraction failures only drop the affected field.

use super::entry::InstallerEntry;
use super::ReconcileContext;
use crate::download::sha256_file;
use crate::error::{Error, Result};
use crate::installers::{msix, BurnBundle, InstallerFormat, InstallerIdentity};
use crate::manifest::canonical::structurally_equal;
use crate::manifest::{FieldMap, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Fields an installer inherits from an earlier installer of the same run
/// sharing its URL and nested files
pub const COPY_FORWARD_FIELDS: &[&str] = &[
    "InstallerSha256",
    "SignatureSha256",
    "PackageFamilyName",
    "ProductCode",
    "ReleaseDate",
    "AppsAndFeaturesEntries",
];

/// List fields normalized to lower-case, de-duplicated and sorted
pub const COSMETIC_LIST_FIELDS: &[&str] = &["Commands", "Protocols", "FileExtensions"];

const ARCHIVE_INSTALLER_TYPE: &str = "zip";

/// Apps & Features keys rewritten from the installer identity
const APPS_AND_FEATURES_KEYS: &[&str] = &["DisplayName", "DisplayVersion", "ProductCode", "UpgradeCode"];

/// URL form written into manifests
pub fn normalize_url(url: &str) -> String {
    url.replace(' ', "%20")
}

/// Refresh the file-derived fields of `installer`
///
/// `old_installer` is the record it was templated on and `prior` the
/// installers already produced by this run.
pub fn resolve(
    ctx: &mut ReconcileContext<'_>,
    mut installer: FieldMap,
    old_installer: &FieldMap,
    entry: &InstallerEntry,
    prior: &[FieldMap],
) -> Result<FieldMap> {
    let raw_url = installer
        .get_str("InstallerUrl")
        .map(str::to_string)
        .ok_or_else(|| Error::ParseError("Installer has no InstallerUrl".to_string()))?;
    let url = normalize_url(&raw_url);
    installer.insert("InstallerUrl", url.as_str());

    if let Some(donor) = find_donor(&installer, &url, prior) {
        debug!("Copying file metadata forward for {}", url);
        copy_forward(&mut installer, donor, entry);
    } else if entry.supplies("InstallerSha256") {
        debug!("InstallerSha256 supplied for {}, not inspecting the file", url);
    } else {
        inspect(ctx, &mut installer, old_installer, entry, &raw_url)?;
    }

    normalize_cosmetic_lists(&mut installer);
    Ok(installer)
}

fn find_donor<'p>(installer: &FieldMap, url: &str, prior: &'p [FieldMap]) -> Option<&'p FieldMap> {
    let nested = installer.get("NestedInstallerFiles");
    prior.iter().find(|candidate| {
        candidate.get_str("InstallerUrl") == Some(url)
            && match (candidate.get("NestedInstallerFiles"), nested) {
                (None, None) => true,
                (Some(a), Some(b)) => structurally_equal(a, b),
                _ => false,
            }
    })
}

fn copy_forward(installer: &mut FieldMap, donor: &FieldMap, entry: &InstallerEntry) {
    for key in COPY_FORWARD_FIELDS {
        if entry.supplies(key) {
            continue;
        }
        match donor.get(key) {
            Some(value) => {
                installer.insert(*key, value.clone());
            }
            None => {
                installer.remove(key);
            }
        }
    }
}

/// Hash the installer file and read identity facts from it
fn inspect(
    ctx: &mut ReconcileContext<'_>,
    installer: &mut FieldMap,
    old_installer: &FieldMap,
    entry: &InstallerEntry,
    raw_url: &str,
) -> Result<()> {
    let path = ctx.obtain(raw_url)?;
    let hash = sha256_file(&path)?;
    info!("{} {}", hash, raw_url);
    installer.insert("InstallerSha256", hash);

    let Some(effective_type) = effective_type(installer) else {
        return Ok(());
    };

    match effective_type.as_str() {
        "msi" | "wix" => {
            let target = locate_installer(ctx, installer, &path)?;
            let needs = Needs::of(installer, old_installer, entry);
            if needs.any() {
                let identity = read_msi_identity(ctx, &target, needs)?;
                apply_identity(installer, old_installer, &identity, needs, &target)?;
            }
        }
        "burn" => {
            let target = locate_installer(ctx, installer, &path)?;
            let needs = Needs::of(installer, old_installer, entry);
            if needs.any() {
                let bundle = BurnBundle::parse(&target)?;
                apply_identity(installer, old_installer, bundle.identity(), needs, &target)?;
            }
        }
        "msix" | "appx" => {
            let target = locate_installer(ctx, installer, &path)?;
            apply_msix(installer, entry, &target);
        }
        _ => {}
    }

    Ok(())
}

/// Installer type after looking through archives
fn effective_type(installer: &FieldMap) -> Option<String> {
    let installer_type = installer.get_str("InstallerType")?.to_ascii_lowercase();
    if installer_type == ARCHIVE_INSTALLER_TYPE {
        installer.get_str("NestedInstallerType").map(str::to_ascii_lowercase)
    } else {
        Some(installer_type)
    }
}

/// The file to inspect: the download itself, or the nested installer
/// named by `NestedInstallerFiles[0].RelativeFilePath` inside an archive
fn locate_installer(ctx: &ReconcileContext<'_>, installer: &FieldMap, path: &Path) -> Result<PathBuf> {
    let is_archive = installer
        .get_str("InstallerType")
        .is_some_and(|t| t.eq_ignore_ascii_case(ARCHIVE_INSTALLER_TYPE));
    if !is_archive {
        return Ok(path.to_path_buf());
    }

    let relative = installer
        .get("NestedInstallerFiles")
        .and_then(Value::as_list)
        .and_then(|files| files.first())
        .and_then(Value::as_map)
        .and_then(|file| file.get_str("RelativeFilePath"))
        .ok_or_else(|| Error::ExtractionFailed {
            field: "NestedInstallerFiles".to_string(),
            path: path.display().to_string(),
        })?;

    let dir = ctx.fetcher.expand_archive(path)?;
    let nested = dir.join(relative.replace('\\', "/"));
    if !nested.is_file() {
        return Err(Error::ExtractionFailed {
            field: "RelativeFilePath".to_string(),
            path: nested.display().to_string(),
        });
    }
    Ok(nested)
}

/// Which identity facts this installer needs refreshed
#[derive(Debug, Clone, Copy)]
struct Needs {
    product_code: bool,
    apps_and_features: bool,
}

impl Needs {
    fn of(installer: &FieldMap, old_installer: &FieldMap, entry: &InstallerEntry) -> Self {
        Self {
            product_code: old_installer.contains_key("ProductCode") && !entry.supplies("ProductCode"),
            apps_and_features: installer.contains_key("AppsAndFeaturesEntries")
                && !entry.supplies("AppsAndFeaturesEntries"),
        }
    }

    fn any(&self) -> bool {
        self.product_code || self.apps_and_features
    }
}

fn read_msi_identity(ctx: &ReconcileContext<'_>, path: &Path, needs: Needs) -> Result<InstallerIdentity> {
    if needs.apps_and_features {
        return ctx.msi.read_identity(path);
    }
    Ok(InstallerIdentity {
        product_code: ctx.msi.read_property(path, crate::installers::msi::PRODUCT_CODE)?,
        ..Default::default()
    })
}

fn apply_identity(
    installer: &mut FieldMap,
    old_installer: &FieldMap,
    identity: &InstallerIdentity,
    needs: Needs,
    path: &Path,
) -> Result<()> {
    if needs.product_code {
        let product_code = identity.product_code.as_deref().ok_or_else(|| Error::ExtractionFailed {
            field: "ProductCode".to_string(),
            path: path.display().to_string(),
        })?;
        installer.insert("ProductCode", product_code);
    }

    if needs.apps_and_features {
        reconcile_apps_and_features(installer, old_installer.get_str("ProductCode"), identity, path)?;
    }

    Ok(())
}

/// Rewrite the Apps & Features entry this installer file describes
///
/// The entry is chosen by upgrade code, then by the old product code, then
/// by being the only one. Only keys the entry already has are rewritten.
fn reconcile_apps_and_features(
    installer: &mut FieldMap,
    old_product_code: Option<&str>,
    identity: &InstallerIdentity,
    path: &Path,
) -> Result<()> {
    let Some(entries) = installer.get_mut("AppsAndFeaturesEntries").and_then(Value::as_list_mut) else {
        return Ok(());
    };

    let position_by = |key: &str, code: Option<&str>| {
        let code = code?;
        entries.iter().position(|entry| {
            entry
                .as_map()
                .and_then(|fields| fields.get_str(key))
                .is_some_and(|value| value.eq_ignore_ascii_case(code))
        })
    };

    let selected = position_by("UpgradeCode", identity.upgrade_code.as_deref())
        .or_else(|| position_by("ProductCode", old_product_code))
        .or_else(|| (entries.len() == 1).then_some(0));

    let Some(index) = selected else {
        debug!("{} AppsAndFeaturesEntries and none selected, leaving them unchanged", entries.len());
        return Ok(());
    };
    let Some(arp) = entries.get_mut(index).and_then(Value::as_map_mut) else {
        return Ok(());
    };

    for key in APPS_AND_FEATURES_KEYS {
        if !arp.contains_key(key) {
            continue;
        }
        let value = match *key {
            "DisplayName" => identity.display_name.as_deref(),
            "DisplayVersion" => identity.display_version.as_deref(),
            "ProductCode" => identity.product_code.as_deref(),
            _ => identity.upgrade_code.as_deref(),
        };
        let value = value.ok_or_else(|| Error::ExtractionFailed {
            field: format!("AppsAndFeaturesEntries.{}", key),
            path: path.display().to_string(),
        })?;
        arp.insert(*key, value);
    }

    Ok(())
}

/// Signature hash and family name; failures drop the field
fn apply_msix(installer: &mut FieldMap, entry: &InstallerEntry, path: &Path) {
    if !entry.supplies("SignatureSha256") {
        match msix::read_signature_hash(path) {
            Ok(hash) => {
                installer.insert("SignatureSha256", hash);
            }
            Err(e) => {
                warn!("Removing SignatureSha256: {}", e);
                installer.remove("SignatureSha256");
            }
        }
    }

    if !entry.supplies("PackageFamilyName") {
        match msix::read_family_name(path) {
            Ok(family_name) => {
                installer.insert("PackageFamilyName", family_name);
            }
            Err(e) => {
                warn!("Removing PackageFamilyName: {}", e);
                installer.remove("PackageFamilyName");
            }
        }
    }
}

/// Split on commas, lower-case, join inner whitespace with `-`, then
/// de-duplicate and sort; `None` when the value is not a list
pub fn normalize_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_list()?;
    let mut normalized: Vec<String> = Vec::new();

    for item in items {
        let Some(text) = item.scalar_text() else {
            continue;
        };
        for part in text.split(',') {
            let token = part.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase();
            if !token.is_empty() && !normalized.contains(&token) {
                normalized.push(token);
            }
        }
    }

    normalized.sort();
    Some(normalized)
}

fn normalize_cosmetic_lists(installer: &mut FieldMap) {
    for key in COSMETIC_LIST_FIELDS {
        let Some(value) = installer.get(key) else {
            continue;
        };
        match normalize_list(value) {
            Some(items) if !items.is_empty() => {
                let items: Vec<Value> = items.into_iter().map(Value::from).collect();
                installer.insert(*key, items);
            }
            Some(_) => {
                installer.remove(key);
            }
            None => {
                warn!("{} is not a list, removing it", key);
                installer.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::tests::FakeFetcher;
    use crate::installers::burn::tests::{build_bundle, BA_DATA_XML};
    use crate::installers::msi::tests::FakeMsiSource;
    use crate::installers::msi::{PRODUCT_CODE, PRODUCT_NAME, PRODUCT_VERSION, UPGRADE_CODE};
    use crate::installers::msix::tests::{build_package, PACKAGE_MANIFEST};
    use crate::installers::msix::{APPX_MANIFEST, APPX_SIGNATURE};
    use crate::update::tests::TestHarness;
    use std::fs;
    use std::io::Write;

    fn map(fields: &[(&str, &str)]) -> FieldMap {
        fields.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect()
    }

    fn arp(fields: &[(&str, &str)]) -> Value {
        Value::List(vec![Value::Map(map(fields))])
    }

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let file = tempfile::NamedTempFile::new().unwrap();
        {
            let mut zip = zip::ZipWriter::new(file.reopen().unwrap());
            for (name, content) in entries {
                zip.start_file(*name, zip::write::SimpleFileOptions::default()).unwrap();
                zip.write_all(content).unwrap();
            }
            zip.finish().unwrap();
        }
        fs::read(file.path()).unwrap()
    }

    #[test]
    fn test_normalize_list() {
        let value = Value::List(vec![
            "Foo Bar, baz".into(),
            "BAZ".into(),
            " qux ".into(),
            "".into(),
        ]);
        assert_eq!(normalize_list(&value).unwrap(), vec!["baz", "foo-bar", "qux"]);
        assert!(normalize_list(&Value::from("foo")).is_none());
    }

    #[test]
    fn test_cosmetic_lists_removed_when_invalid_or_empty() {
        let mut installer = FieldMap::new();
        installer.insert("Commands", "not-a-list");
        installer.insert("Protocols", Value::List(vec![" , ".into()]));
        installer.insert("FileExtensions", Value::List(vec!["TXT".into(), "md".into()]));

        normalize_cosmetic_lists(&mut installer);

        assert!(!installer.contains_key("Commands"));
        assert!(!installer.contains_key("Protocols"));
        assert_eq!(
            installer.get("FileExtensions"),
            Some(&Value::List(vec!["md".into(), "txt".into()]))
        );
    }

    #[test]
    fn test_url_normalized_but_raw_url_fetched() {
        let fetcher = FakeFetcher::new().serve("https://example.com/My App.exe", b"exe");
        let harness = TestHarness::new(fetcher, FakeMsiSource::default());
        let mut ctx = harness.context();

        let installer = map(&[("InstallerType", "exe"), ("InstallerUrl", "https://example.com/My App.exe")]);
        let entry = InstallerEntry::default();
        let result = resolve(&mut ctx, installer.clone(), &installer, &entry, &[]).unwrap();

        assert_eq!(result.get_str("InstallerUrl"), Some("https://example.com/My%20App.exe"));
        assert_eq!(
            harness.fetcher.requests.borrow()[0].0,
            "https://example.com/My App.exe"
        );
        assert_eq!(result.get_str("InstallerSha256").map(str::len), Some(64));
    }

    #[test]
    fn test_copy_forward_entry_wins() {
        let harness = TestHarness::new(FakeFetcher::new(), FakeMsiSource::default());
        let mut ctx = harness.context();

        let donor = map(&[
            ("InstallerUrl", "https://example.com/a.msi"),
            ("InstallerSha256", "AA"),
            ("ProductCode", "{DONOR}"),
        ]);
        let installer = map(&[
            ("InstallerUrl", "https://example.com/a.msi"),
            ("ProductCode", "{OLD}"),
            ("PackageFamilyName", "Stale_1234567890abc"),
        ]);
        let entry = InstallerEntry::new(map(&[("ProductCode", "{ENTRY}")]));

        let result = resolve(&mut ctx, installer.clone(), &installer, &entry, &[donor]).unwrap();

        assert_eq!(result.get_str("InstallerSha256"), Some("AA"));
        assert_eq!(result.get_str("ProductCode"), Some("{OLD}"));
        assert!(!result.contains_key("PackageFamilyName"));
        assert_eq!(harness.fetcher.request_count(), 0);
    }

    #[test]
    fn test_copy_forward_requires_same_nested_files() {
        let fetcher = FakeFetcher::new().serve(
            "https://example.com/a.zip",
            &zip_bytes(&[("a.exe", b"a"), ("b.exe", b"b")]),
        );
        let harness = TestHarness::new(fetcher, FakeMsiSource::default());
        let mut ctx = harness.context();

        let nested = |path: &str| {
            let mut file = FieldMap::new();
            file.insert("RelativeFilePath", path);
            Value::List(vec![Value::Map(file)])
        };
        let mut donor = map(&[("InstallerUrl", "https://example.com/a.zip"), ("InstallerSha256", "AA")]);
        donor.insert("NestedInstallerFiles", nested("a.exe"));
        let mut installer = map(&[
            ("InstallerType", "zip"),
            ("NestedInstallerType", "exe"),
            ("InstallerUrl", "https://example.com/a.zip"),
        ]);
        installer.insert("NestedInstallerFiles", nested("b.exe"));

        let result = resolve(&mut ctx, installer.clone(), &installer, &InstallerEntry::default(), &[donor]).unwrap();
        assert_ne!(result.get_str("InstallerSha256"), Some("AA"));
        assert_eq!(harness.fetcher.request_count(), 1);
    }

    #[test]
    fn test_msi_product_code_and_apps_and_features() {
        let fetcher = FakeFetcher::new().serve("https://example.com/setup.msi", b"msi");
        let msi = FakeMsiSource::default().with(
            "setup.msi",
            &[
                (PRODUCT_CODE, "{NEW-PRODUCT}"),
                (UPGRADE_CODE, "{UPGRADE}"),
                (PRODUCT_NAME, "Contoso App"),
                (PRODUCT_VERSION, "2.0.0"),
            ],
        );
        let harness = TestHarness::new(fetcher, msi);
        let mut ctx = harness.context();

        let mut installer = map(&[
            ("InstallerType", "msi"),
            ("InstallerUrl", "https://example.com/setup.msi"),
            ("ProductCode", "{OLD-PRODUCT}"),
        ]);
        installer.insert(
            "AppsAndFeaturesEntries",
            arp(&[("DisplayVersion", "1.0.0"), ("ProductCode", "{OLD-PRODUCT}")]),
        );

        let result = resolve(&mut ctx, installer.clone(), &installer, &InstallerEntry::default(), &[]).unwrap();

        assert_eq!(result.get_str("ProductCode"), Some("{NEW-PRODUCT}"));
        let entries = result.get("AppsAndFeaturesEntries").and_then(Value::as_list).unwrap();
        let arp = entries[0].as_map().unwrap();
        assert_eq!(arp.get_str("DisplayVersion"), Some("2.0.0"));
        assert_eq!(arp.get_str("ProductCode"), Some("{NEW-PRODUCT}"));
        assert!(!arp.contains_key("DisplayName"));
        assert!(!arp.contains_key("UpgradeCode"));
    }

    #[test]
    fn test_msi_missing_product_code_is_fatal() {
        let fetcher = FakeFetcher::new().serve("https://example.com/setup.msi", b"msi");
        let harness = TestHarness::new(fetcher, FakeMsiSource::default());
        let mut ctx = harness.context();

        let installer = map(&[
            ("InstallerType", "msi"),
            ("InstallerUrl", "https://example.com/setup.msi"),
            ("ProductCode", "{OLD}"),
        ]);
        let result = resolve(&mut ctx, installer.clone(), &installer, &InstallerEntry::default(), &[]);
        match result {
            Err(Error::ExtractionFailed { field, .. }) => assert_eq!(field, "ProductCode"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_msi_without_product_code_is_not_inspected() {
        let fetcher = FakeFetcher::new().serve("https://example.com/setup.msi", b"msi");
        let harness = TestHarness::new(fetcher, FakeMsiSource::default());
        let mut ctx = harness.context();

        let installer = map(&[("InstallerType", "wix"), ("InstallerUrl", "https://example.com/setup.msi")]);
        let result = resolve(&mut ctx, installer.clone(), &installer, &InstallerEntry::default(), &[]).unwrap();
        assert!(!result.contains_key("ProductCode"));
    }

    #[test]
    fn test_apps_and_features_selected_by_upgrade_code() {
        let mut installer = FieldMap::new();
        installer.insert(
            "AppsAndFeaturesEntries",
            Value::List(vec![
                Value::Map(map(&[("DisplayName", "Old A"), ("UpgradeCode", "{A}")])),
                Value::Map(map(&[("DisplayName", "Old B"), ("UpgradeCode", "{b}")])),
            ]),
        );
        let identity = InstallerIdentity {
            product_code: Some("{P}".to_string()),
            upgrade_code: Some("{B}".to_string()),
            display_name: Some("New B".to_string()),
            display_version: None,
        };

        reconcile_apps_and_features(&mut installer, None, &identity, Path::new("x.msi")).unwrap();

        let entries = installer.get("AppsAndFeaturesEntries").and_then(Value::as_list).unwrap();
        assert_eq!(entries[0].as_map().unwrap().get_str("DisplayName"), Some("Old A"));
        assert_eq!(entries[1].as_map().unwrap().get_str("DisplayName"), Some("New B"));
        assert_eq!(entries[1].as_map().unwrap().get_str("UpgradeCode"), Some("{B}"));
    }

    #[test]
    fn test_apps_and_features_selected_by_old_product_code() {
        let mut installer = FieldMap::new();
        installer.insert(
            "AppsAndFeaturesEntries",
            Value::List(vec![
                Value::Map(map(&[("DisplayVersion", "1.0"), ("ProductCode", "{OTHER}"), ("UpgradeCode", "{U1}")])),
                Value::Map(map(&[("DisplayVersion", "1.0"), ("ProductCode", "{old-product}"), ("UpgradeCode", "{U2}")])),
            ]),
        );
        let identity = InstallerIdentity {
            product_code: Some("{NEW-PRODUCT}".to_string()),
            upgrade_code: Some("{NO-MATCH}".to_string()),
            display_name: None,
            display_version: Some("2.0".to_string()),
        };

        reconcile_apps_and_features(&mut installer, Some("{OLD-PRODUCT}"), &identity, Path::new("x.msi")).unwrap();

        let entries = installer.get("AppsAndFeaturesEntries").and_then(Value::as_list).unwrap();
        let untouched = entries[0].as_map().unwrap();
        assert_eq!(untouched.get_str("ProductCode"), Some("{OTHER}"));
        assert_eq!(untouched.get_str("DisplayVersion"), Some("1.0"));

        let selected = entries[1].as_map().unwrap();
        assert_eq!(selected.get_str("ProductCode"), Some("{NEW-PRODUCT}"));
        assert_eq!(selected.get_str("DisplayVersion"), Some("2.0"));
        assert_eq!(selected.get_str("UpgradeCode"), Some("{NO-MATCH}"));
    }

    #[test]
    fn test_apps_and_features_ambiguous_left_alone() {
        let mut installer = FieldMap::new();
        let entries = Value::List(vec![
            Value::Map(map(&[("DisplayName", "A")])),
            Value::Map(map(&[("DisplayName", "B")])),
        ]);
        installer.insert("AppsAndFeaturesEntries", entries.clone());

        let identity = InstallerIdentity {
            display_name: Some("C".to_string()),
            ..Default::default()
        };
        reconcile_apps_and_features(&mut installer, None, &identity, Path::new("x.msi")).unwrap();
        assert_eq!(installer.get("AppsAndFeaturesEntries"), Some(&entries));
    }

    #[test]
    fn test_burn_identity() {
        let fetcher = FakeFetcher::new().serve("https://example.com/bundle.exe", &build_bundle(Some(BA_DATA_XML)));
        let harness = TestHarness::new(fetcher, FakeMsiSource::default());
        let mut ctx = harness.context();

        let mut installer = map(&[
            ("InstallerType", "burn"),
            ("InstallerUrl", "https://example.com/bundle.exe"),
            ("ProductCode", "{OLD}"),
        ]);
        installer.insert(
            "AppsAndFeaturesEntries",
            arp(&[("DisplayName", "Old"), ("UpgradeCode", "{OLD-UPGRADE}")]),
        );

        let result = resolve(&mut ctx, installer.clone(), &installer, &InstallerEntry::default(), &[]).unwrap();

        assert_eq!(result.get_str("ProductCode"), Some("{12345678-1234-5678-9ABC-DEF012345678}"));
        let arp = result.get("AppsAndFeaturesEntries").and_then(Value::as_list).unwrap()[0]
            .as_map()
            .unwrap()
            .clone();
        assert_eq!(arp.get_str("DisplayName"), Some("Contoso Suite (x64)"));
        assert_eq!(arp.get_str("UpgradeCode"), Some("{99999999-8888-7777-6666-555555555555}"));
    }

    #[test]
    fn test_msix_fields_degrade() {
        let signed = build_package(&[
            (APPX_MANIFEST, PACKAGE_MANIFEST.as_bytes()),
            (APPX_SIGNATURE, b"signature"),
        ]);
        let unsigned = build_package(&[(APPX_MANIFEST, PACKAGE_MANIFEST.as_bytes())]);
        let fetcher = FakeFetcher::new()
            .serve("https://example.com/signed.msix", &fs::read(signed.path()).unwrap())
            .serve("https://example.com/unsigned.msix", &fs::read(unsigned.path()).unwrap());
        let harness = TestHarness::new(fetcher, FakeMsiSource::default());
        let mut ctx = harness.context();

        let signed_installer = map(&[("InstallerType", "msix"), ("InstallerUrl", "https://example.com/signed.msix")]);
        let result = resolve(&mut ctx, signed_installer.clone(), &signed_installer, &InstallerEntry::default(), &[])
            .unwrap();
        assert_eq!(result.get_str("PackageFamilyName"), Some("Microsoft.WindowsTerminal_8wekyb3d8bbwe"));
        assert_eq!(result.get_str("SignatureSha256").map(str::len), Some(64));

        let unsigned_installer = map(&[
            ("InstallerType", "msix"),
            ("InstallerUrl", "https://example.com/unsigned.msix"),
            ("SignatureSha256", "STALE"),
        ]);
        let result = resolve(
            &mut ctx,
            unsigned_installer.clone(),
            &unsigned_installer,
            &InstallerEntry::default(),
            &[],
        )
        .unwrap();
        assert!(!result.contains_key("SignatureSha256"));
        assert_eq!(result.get_str("PackageFamilyName"), Some("Microsoft.WindowsTerminal_8wekyb3d8bbwe"));
    }

    #[test]
    fn test_nested_msi_in_archive() {
        let fetcher = FakeFetcher::new().serve(
            "https://example.com/bundle.zip",
            &zip_bytes(&[("bin/setup.msi", b"nested msi")]),
        );
        let msi = FakeMsiSource::default().with("setup.msi", &[(PRODUCT_CODE, "{NESTED}")]);
        let harness = TestHarness::new(fetcher, msi);
        let mut ctx = harness.context();

        let mut file = FieldMap::new();
        file.insert("RelativeFilePath", "bin\\setup.msi");
        let mut installer = map(&[
            ("InstallerType", "zip"),
            ("NestedInstallerType", "msi"),
            ("InstallerUrl", "https://example.com/bundle.zip"),
            ("ProductCode", "{OLD}"),
        ]);
        installer.insert("NestedInstallerFiles", Value::List(vec![Value::Map(file)]));

        let result = resolve(&mut ctx, installer.clone(), &installer, &InstallerEntry::default(), &[]).unwrap();
        assert_eq!(result.get_str("ProductCode"), Some("{NESTED}"));
    }
}
