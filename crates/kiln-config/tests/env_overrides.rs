//! `KILN_*` environment overrides. Each test runs in a figment jail so the
//! environment changes stay isolated.

use figment::Jail;
use kiln_config::ConfigDiscovery;

#[test]
fn environment_overrides_file_values() {
    Jail::expect_with(|jail| {
        jail.create_file("kiln.toml", "entries = [\"index.html\"]\nhot_update = true\n")?;
        jail.set_env("KILN_VERSIONING", "false");
        jail.set_env("KILN_HOT_UPDATE", "false");

        let config = ConfigDiscovery::new(jail.directory()).load().unwrap();
        assert!(!config.versioning);
        assert!(!config.hot_update);
        Ok(())
    });
}

#[test]
fn environment_beats_profiles() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "kiln.toml",
            "entries = [\"index.html\"]\n[profiles.ci]\nversioning = false\n",
        )?;
        jail.set_env("KILN_VERSIONING", "true");

        let config = ConfigDiscovery::new(jail.directory())
            .with_profile("ci")
            .load()
            .unwrap();
        assert!(config.versioning);
        Ok(())
    });
}

#[test]
fn unrelated_variables_are_ignored() {
    Jail::expect_with(|jail| {
        jail.create_file("kiln.toml", "entries = [\"index.html\"]\n")?;
        jail.set_env("KILN_OUT_DIR", "elsewhere");

        let config = ConfigDiscovery::new(jail.directory()).load().unwrap();
        assert_eq!(config.out_dir, std::path::PathBuf::from("dist"));
        assert!(config.versioning);
        Ok(())
    });
}

#[test]
fn environment_can_be_disabled() {
    Jail::expect_with(|jail| {
        jail.create_file("kiln.toml", "entries = [\"index.html\"]\n")?;
        jail.set_env("KILN_VERSIONING", "false");

        let config = ConfigDiscovery::new(jail.directory()).without_env().load().unwrap();
        assert!(config.versioning);
        Ok(())
    });
}

#[test]
fn malformed_value_is_an_error() {
    Jail::expect_with(|jail| {
        jail.create_file("kiln.toml", "entries = [\"index.html\"]\n")?;
        jail.set_env("KILN_HOT_UPDATE", "perhaps");

        let result = ConfigDiscovery::new(jail.directory()).load();
        assert!(matches!(result, Err(kiln_config::ConfigError::Environment(_))));
        Ok(())
    });
}
