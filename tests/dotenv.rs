// ABOUTME: Checks that settings from a .env file reach the server configuration.
// ABOUTME: Runs in its own test binary so it can mutate the process environment.

use std::io::Write;
use std::time::Duration;

use billboard_server::BillboardConfig;

#[test]
fn dotenv_file_feeds_config_without_overriding_real_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join(".env");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "BILLBOARD_BIND=127.0.0.1:9123").unwrap();
    writeln!(file, "BILLBOARD_TXN_TIMEOUT_MS=1500").unwrap();
    writeln!(file, "CLOUDINARY_CLOUD_NAME=from-file").unwrap();
    writeln!(file, "CLOUDINARY_API_KEY=key").unwrap();
    writeln!(file, "CLOUDINARY_API_SECRET=secret").unwrap();
    drop(file);

    // SAFETY: this is the only test in this binary
    unsafe {
        std::env::set_var("BILLBOARD_TXN_TIMEOUT_MS", "250");
    }

    dotenvy::from_path(&path).unwrap();
    let config = BillboardConfig::from_env().unwrap();

    assert_eq!(config.bind.port(), 9123);
    assert_eq!(config.txn_timeout, Duration::from_millis(250));
    assert_eq!(config.cloudinary.unwrap().cloud_name, "from-file");
}
