#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validate arbitrary TOML; errors are fine, panics are not.
    if let Ok(cfg) = irvol_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // A validated volume section must always normalize to finite levels.
            if let Some(vol) = cfg.volume.as_ref() {
                for (level, _) in &vol.levels {
                    assert!(vol.normalize(*level).is_finite());
                }
            }
        }
    }
});
