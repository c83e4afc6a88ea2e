use anyhow::{bail, Result};
use cs_core::ports::SettingsMigrationPort;
use cs_core::settings::{Settings, CURRENT_SCHEMA_VERSION};

pub struct SettingsMigrator {
    migrations: Vec<Box<dyn SettingsMigrationPort>>,
    target: u32,
}

impl Default for SettingsMigrator {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsMigrator {
    pub fn new() -> Self {
        Self {
            migrations: Vec::new(),
            target: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn with_migrations(migrations: Vec<Box<dyn SettingsMigrationPort>>, target: u32) -> Self {
        Self { migrations, target }
    }

    pub fn migrate_to_latest(&self, mut settings: Settings) -> Result<Settings> {
        while settings.schema_version < self.target {
            let current = settings.schema_version;
            let Some(migration) = self.migrations.iter().find(|m| m.from_version() == current)
            else {
                bail!("no settings migration from version {}", current);
            };

            settings = migration.migrate(settings);
            settings.schema_version = migration.to_version();
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ZeroToOne;

    impl SettingsMigrationPort for ZeroToOne {
        fn from_version(&self) -> u32 {
            0
        }

        fn to_version(&self) -> u32 {
            1
        }

        fn migrate(&self, mut settings: Settings) -> Settings {
            if settings.history.max_history_items == 0 {
                settings.history.max_history_items = 200;
            }
            settings
        }
    }

    #[test]
    fn current_version_passes_through() {
        let migrated = SettingsMigrator::new()
            .migrate_to_latest(Settings::default())
            .expect("migrate");
        assert_eq!(migrated, Settings::default());
    }

    #[test]
    fn applies_registered_steps() {
        let migrator = SettingsMigrator::with_migrations(vec![Box::new(ZeroToOne)], 1);
        let mut old = Settings::default();
        old.schema_version = 0;
        old.history.max_history_items = 0;

        let migrated = migrator.migrate_to_latest(old).expect("migrate");
        assert_eq!(migrated.schema_version, 1);
        assert_eq!(migrated.history.max_history_items, 200);
    }

    #[test]
    fn missing_step_is_an_error() {
        let migrator = SettingsMigrator::with_migrations(Vec::new(), 2);
        assert!(migrator.migrate_to_latest(Settings::default()).is_err());
    }
}
