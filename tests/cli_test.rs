use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

#[test]
fn test_cli_signed_in_checkout() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/checkout.csv").arg("--signed-in");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"type\":\"CHECKOUT_PAGE_VIEW\""))
        .stdout(predicate::str::contains("ORDER_CONFIRMATION_PAGE_VIEW"))
        .stdout(predicate::str::contains("\"target\":\"order_confirmation\""))
        .stdout(predicate::str::contains("\"order_number\":\"000000001\""))
        // Funnel is back at the entry point
        .stdout(predicate::str::contains(
            "\"kind\":\"summary\",\"step\":\"SHIPPING_ADDRESS\"",
        ));

    Ok(())
}

#[test]
fn test_cli_guest_checkout() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/checkout.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"target\":\"checkout_entry\""))
        .stdout(predicate::str::contains("\"route\":\"/checkout\""))
        .stdout(predicate::str::contains("order_confirmation").not());

    Ok(())
}

#[test]
fn test_cli_fixture_order_number() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/checkout.csv")
        .arg("--signed-in")
        .arg("--fixture")
        .arg("tests/fixtures/order_123.json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"order_number\":\"000000123\""));

    Ok(())
}

#[test]
fn test_cli_unknown_signal_is_skipped() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/unknown_signal.csv");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading signal"))
        .stdout(predicate::str::contains("\"step\":\"SHIPPING_METHOD\""));

    Ok(())
}

#[test]
fn test_cli_config_file_routes() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = tempfile::NamedTempFile::new()?;
    write!(config, "{{\"checkout_route\": \"/cart\"}}")?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/checkout.csv")
        .arg("--config")
        .arg(config.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"route\":\"/cart\""));

    Ok(())
}

#[test]
fn test_cli_lists_payment_methods() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/refresh.csv")
        .env_remove("CHECKOUT_DISABLED_PAYMENTS");

    cmd.assert().success().stdout(predicate::str::contains(
        "\"payment_methods\":[\"checkmo\",\"banktransfer\"]",
    ));

    Ok(())
}

#[test]
fn test_cli_env_disables_payment_methods() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/refresh.csv")
        .env("CHECKOUT_DISABLED_PAYMENTS", "banktransfer");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"payment_methods\":[\"checkmo\"]"));

    Ok(())
}

#[test]
fn test_cli_flag_overrides_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = tempfile::NamedTempFile::new()?;
    write!(config, "{{\"disabled_payment_methods\": [\"checkmo\"]}}")?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/refresh.csv")
        .arg("--config")
        .arg(config.path())
        .arg("--disabled-payments")
        .arg("banktransfer");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"payment_methods\":[\"checkmo\"]"));

    Ok(())
}

#[test]
fn test_cli_missing_input_fails() {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/does_not_exist.csv");

    cmd.assert().failure();
}
