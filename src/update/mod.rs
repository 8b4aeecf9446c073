// src/update/mod.rs

//! Manifest set reconciliation
//!
//! `ManifestUpdater::reconcile` produces the manifest set of a new package
//! version from the previous set and a list of update instructions:
//!
//! 1. Push manifest-level installer fields down onto every installer
//! 2. Reconcile installers against the installer entries
//! 3. Pull fields all installers share back up to manifest level
//! 4. Apply locale entries
//! 5. Stamp `PackageVersion` and `ManifestVersion`, order keys by schema
//!
//! A failed run returns the error and no partial manifest set.

pub mod entry;
pub mod hoist;
pub mod installers;
pub mod metadata;

pub use entry::{InstallerEntry, LocaleEntry, Query, ReconcileMode, UpdateInstructions};

use crate::config::{Config, FetchConfig};
use crate::download::{fetch_with_fallback, InstallerCache, InstallerFetcher};
use crate::error::{Error, Result};
use crate::installers::MsiMetadataSource;
use crate::manifest::{FieldMap, ManifestSet, SchemaProvider, SchemaValidator, Validator, Value, WingetSchema};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Collaborators and per-run download state shared by the reconciler and
/// the metadata orchestrator
pub struct ReconcileContext<'a> {
    pub(crate) schema: &'a dyn SchemaProvider,
    pub(crate) validator: &'a dyn Validator,
    pub(crate) fetcher: &'a dyn InstallerFetcher,
    pub(crate) msi: &'a dyn MsiMetadataSource,
    pub(crate) fetch_config: &'a FetchConfig,
    pub(crate) run_cache: InstallerCache,
    pub(crate) external_cache: Option<&'a InstallerCache>,
    touched: Vec<String>,
}

impl<'a> ReconcileContext<'a> {
    pub(crate) fn new(
        schema: &'a dyn SchemaProvider,
        validator: &'a dyn Validator,
        fetcher: &'a dyn InstallerFetcher,
        msi: &'a dyn MsiMetadataSource,
        fetch_config: &'a FetchConfig,
        external_cache: Option<&'a InstallerCache>,
    ) -> Self {
        Self {
            schema,
            validator,
            fetcher,
            msi,
            fetch_config,
            run_cache: InstallerCache::new(),
            external_cache,
            touched: Vec::new(),
        }
    }

    /// Local copy of `url`: external cache, then run cache, then download
    pub(crate) fn obtain(&mut self, url: &str) -> Result<PathBuf> {
        if let Some(path) = self.external_cache.and_then(|cache| cache.get(url)) {
            debug!("Using externally cached {}", url);
            return Ok(path.to_path_buf());
        }

        if !self.touched.iter().any(|touched| touched == url) {
            self.touched.push(url.to_string());
        }

        if let Some(path) = self.run_cache.get(url) {
            debug!("Using cached download of {}", url);
            return Ok(path.to_path_buf());
        }

        let path = fetch_with_fallback(self.fetcher, url, self.fetch_config)?;
        self.run_cache.insert(url, path.clone());
        Ok(path)
    }

    /// Release every run-cache entry obtained since the last release
    pub(crate) fn release_touched(&mut self) {
        for url in std::mem::take(&mut self.touched) {
            self.run_cache.release(&url);
        }
    }
}

/// Builds the manifest set of a new package version
pub struct ManifestUpdater<'a> {
    fetcher: &'a dyn InstallerFetcher,
    msi: &'a dyn MsiMetadataSource,
    config: Config,
    schema: Box<dyn SchemaProvider + 'a>,
    validator: Box<dyn Validator + 'a>,
    external_cache: Option<&'a InstallerCache>,
}

impl<'a> ManifestUpdater<'a> {
    /// Updater with the built-in schema and validator
    pub fn new(fetcher: &'a dyn InstallerFetcher, msi: &'a dyn MsiMetadataSource, config: Config) -> Self {
        Self {
            fetcher,
            msi,
            config,
            schema: Box::new(WingetSchema::new()),
            validator: Box::new(SchemaValidator::new()),
            external_cache: None,
        }
    }

    pub fn with_schema(mut self, schema: impl SchemaProvider + 'a) -> Self {
        self.schema = Box::new(schema);
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'a) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Reuse downloads from a caller-owned cache; its entries are never
    /// released
    pub fn with_external_cache(mut self, cache: &'a InstallerCache) -> Self {
        self.external_cache = Some(cache);
        self
    }

    pub fn schema(&self) -> &dyn SchemaProvider {
        self.schema.as_ref()
    }

    /// Produce the manifest set for `package_version`
    pub fn reconcile(
        &self,
        old_set: &ManifestSet,
        instructions: &UpdateInstructions,
        package_version: &str,
    ) -> Result<ManifestSet> {
        info!(
            "Reconciling {} {} ({:?} mode, {} installer entries, {} locale entries)",
            old_set.version.package_identifier().unwrap_or("<unknown>"),
            package_version,
            instructions.mode,
            instructions.installer_entries.len(),
            instructions.locale_entries.len()
        );

        let mut set = old_set.clone();

        if let Some(manifest) = set.installer.as_mut() {
            let installers = self.reconcile_installer_manifest(&mut manifest.fields, instructions)?;
            let items: Vec<Value> = installers.into_iter().map(Value::Map).collect();
            manifest.fields.insert("Installers", items);
        } else if !instructions.installer_entries.is_empty() {
            warn!("Manifest set has no installer manifest, ignoring installer entries");
        }

        for locale_entry in &instructions.locale_entries {
            self.apply_locale_entry(&mut set, locale_entry)?;
        }

        let manifest_version = self.config.manifest.manifest_version.as_str();
        for manifest in set.manifests_mut() {
            manifest.fields.insert("PackageVersion", package_version);
            manifest.fields.insert("ManifestVersion", manifest_version);
            manifest.sort_keys(self.schema.as_ref());
        }

        Ok(set)
    }

    /// Push, reconcile and pull the installers of an installer manifest
    fn reconcile_installer_manifest(
        &self,
        fields: &mut FieldMap,
        instructions: &UpdateInstructions,
    ) -> Result<Vec<FieldMap>> {
        let hoistable = self.schema.hoistable_keys();
        let max_depth = self.config.hoist.max_depth;

        let mut old_installers: Vec<FieldMap> = fields
            .get("Installers")
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_map).cloned().collect())
            .unwrap_or_default();
        hoist::push_to_installer_level(fields, &mut old_installers, &hoistable, max_depth);

        let mut ctx = ReconcileContext::new(
            self.schema.as_ref(),
            self.validator.as_ref(),
            self.fetcher,
            self.msi,
            &self.config.fetch,
            self.external_cache,
        );
        let mut installers =
            installers::reconcile_installers(&mut ctx, instructions.mode, &old_installers, &instructions.installer_entries)?;

        hoist::pull_to_manifest_level(&mut installers, fields, &hoistable, max_depth);
        Ok(installers)
    }

    fn apply_locale_entry(&self, set: &mut ManifestSet, entry: &LocaleEntry) -> Result<()> {
        let schema = self
            .schema
            .locale_field(&entry.key)
            .ok_or_else(|| Error::UnrecognizedKey(entry.key.clone()))?;

        if let Err(e) = self.validator.validate(&entry.value, schema) {
            warn!("Discarding invalid {} '{}': {}", entry.key, entry.value, e);
            return Ok(());
        }

        let manifest = match &entry.locale {
            Some(tag) => set.locale_mut(tag).ok_or_else(|| Error::UnknownLocale(tag.clone()))?,
            None => {
                let tag = set.default_locale_tag().unwrap_or("<default>").to_string();
                set.default_locale_mut().ok_or(Error::UnknownLocale(tag))?
            }
        };

        debug!("Setting {} on locale {}", entry.key, manifest.locale().unwrap_or("<unknown>"));
        manifest.fields.insert(entry.key.as_str(), entry.value.clone());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::download::tests::FakeFetcher;
    use crate::installers::msi::tests::FakeMsiSource;
    use crate::manifest::{Manifest, ManifestType};

    /// Owns the collaborators a `ReconcileContext` borrows
    pub(crate) struct TestHarness {
        pub(crate) fetcher: FakeFetcher,
        pub(crate) msi: FakeMsiSource,
        pub(crate) schema: WingetSchema,
        pub(crate) validator: SchemaValidator,
        pub(crate) config: FetchConfig,
    }

    impl TestHarness {
        pub(crate) fn new(fetcher: FakeFetcher, msi: FakeMsiSource) -> Self {
            Self {
                fetcher,
                msi,
                schema: WingetSchema::new(),
                validator: SchemaValidator::new(),
                config: FetchConfig::default(),
            }
        }

        pub(crate) fn context(&self) -> ReconcileContext<'_> {
            ReconcileContext::new(&self.schema, &self.validator, &self.fetcher, &self.msi, &self.config, None)
        }
    }

    fn manifest(manifest_type: ManifestType, extra: &[(&str, Value)]) -> Manifest {
        let mut fields = FieldMap::new();
        fields.insert("PackageIdentifier", "Contoso.App");
        fields.insert("PackageVersion", "1.0.0");
        for (key, value) in extra {
            fields.insert(*key, value.clone());
        }
        fields.insert("ManifestType", manifest_type.as_str());
        fields.insert("ManifestVersion", "1.6.0");
        Manifest::new(manifest_type, fields)
    }

    fn installer(arch: &str) -> Value {
        let mut fields = FieldMap::new();
        fields.insert("Architecture", arch);
        fields.insert("InstallerUrl", format!("https://example.com/{}.exe", arch));
        fields.insert("InstallerSha256", "A".repeat(64));
        Value::Map(fields)
    }

    fn manifest_set() -> ManifestSet {
        ManifestSet::from_manifests(vec![
            manifest(ManifestType::Version, &[("DefaultLocale", "en-US".into())]),
            manifest(
                ManifestType::Installer,
                &[
                    ("InstallerType", "exe".into()),
                    ("Installers", Value::List(vec![installer("x64"), installer("x86")])),
                ],
            ),
            manifest(
                ManifestType::DefaultLocale,
                &[("PackageLocale", "en-US".into()), ("ShortDescription", "An app".into())],
            ),
            manifest(ManifestType::Locale, &[("PackageLocale", "zh-CN".into())]),
        ])
        .unwrap()
    }

    #[test]
    fn test_version_and_schema_version_stamped() {
        let fetcher = FakeFetcher::new();
        let msi = FakeMsiSource::default();
        let updater = ManifestUpdater::new(&fetcher, &msi, Config::default());

        let set = updater
            .reconcile(&manifest_set(), &UpdateInstructions::default(), "2.0.0")
            .unwrap();

        for manifest in set.manifests() {
            assert_eq!(manifest.fields.get_str("PackageVersion"), Some("2.0.0"));
            assert_eq!(manifest.fields.get_str("ManifestVersion"), Some("1.10.0"));
            assert_eq!(manifest.fields.keys().next(), Some("PackageIdentifier"));
        }
    }

    #[test]
    fn test_locale_entries() {
        let fetcher = FakeFetcher::new();
        let msi = FakeMsiSource::default();
        let updater = ManifestUpdater::new(&fetcher, &msi, Config::default());

        let instructions = UpdateInstructions {
            locale_entries: vec![
                LocaleEntry::new("ReleaseNotesUrl", "https://example.com/notes"),
                LocaleEntry::new("ShortDescription", "一个应用").for_locale("zh-cn"),
                LocaleEntry::new("PrivacyUrl", "not a url"),
            ],
            ..Default::default()
        };
        let mut set = updater.reconcile(&manifest_set(), &instructions, "2.0.0").unwrap();

        let default = set.default_locale_mut().unwrap();
        assert_eq!(default.fields.get_str("ReleaseNotesUrl"), Some("https://example.com/notes"));
        assert!(!default.fields.contains_key("PrivacyUrl"));
        let zh = set.locale_mut("zh-CN").unwrap();
        assert_eq!(zh.fields.get_str("ShortDescription"), Some("一个应用"));
    }

    #[test]
    fn test_unknown_locale_key_is_fatal() {
        let fetcher = FakeFetcher::new();
        let msi = FakeMsiSource::default();
        let updater = ManifestUpdater::new(&fetcher, &msi, Config::default());

        let instructions = UpdateInstructions {
            locale_entries: vec![LocaleEntry::new("Summary", "x")],
            ..Default::default()
        };
        let result = updater.reconcile(&manifest_set(), &instructions, "2.0.0");
        assert!(matches!(result, Err(Error::UnrecognizedKey(_))));
    }

    #[test]
    fn test_unknown_locale_tag() {
        let fetcher = FakeFetcher::new();
        let msi = FakeMsiSource::default();
        let updater = ManifestUpdater::new(&fetcher, &msi, Config::default());

        let instructions = UpdateInstructions {
            locale_entries: vec![LocaleEntry::new("ShortDescription", "Eine App").for_locale("de-DE")],
            ..Default::default()
        };
        let result = updater.reconcile(&manifest_set(), &instructions, "2.0.0");
        assert!(matches!(result, Err(Error::UnknownLocale(_))));
    }

    #[test]
    fn test_shared_fields_stay_hoisted() {
        let fetcher = FakeFetcher::new();
        let msi = FakeMsiSource::default();
        let updater = ManifestUpdater::new(&fetcher, &msi, Config::default());

        let mut fields = FieldMap::new();
        fields.insert("InstallerUrl", "https://example.com/new.exe");
        fields.insert("InstallerSha256", "B".repeat(64));
        let instructions = UpdateInstructions {
            installer_entries: vec![InstallerEntry::new(fields)],
            ..Default::default()
        };

        let set = updater.reconcile(&manifest_set(), &instructions, "2.0.0").unwrap();
        let manifest = set.installer.unwrap();

        assert_eq!(manifest.fields.get_str("InstallerType"), Some("exe"));
        let installers = manifest.installers();
        assert_eq!(installers.len(), 2);
        assert!(installers.iter().all(|i| !i.contains_key("InstallerType")));
    }

    #[test]
    fn test_external_cache_is_used_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("new.exe");
        std::fs::write(&cached, b"cached").unwrap();
        let mut external = InstallerCache::new();
        external.insert("https://example.com/new.exe", cached.clone());

        let fetcher = FakeFetcher::new();
        let msi = FakeMsiSource::default();
        let updater = ManifestUpdater::new(&fetcher, &msi, Config::default()).with_external_cache(&external);

        let mut fields = FieldMap::new();
        fields.insert("InstallerUrl", "https://example.com/new.exe");
        let instructions = UpdateInstructions {
            installer_entries: vec![InstallerEntry::new(fields)],
            ..Default::default()
        };
        updater.reconcile(&manifest_set(), &instructions, "2.0.0").unwrap();

        assert_eq!(fetcher.request_count(), 0);
        assert!(cached.exists());
        assert_eq!(external.len(), 1);
    }
}
