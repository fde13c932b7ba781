use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use concierge_cli::commands::{doctor, migrate, seed, tool};
use serde_json::Value;
use tempfile::TempDir;

const BOOKING_ARGS: &str = r#"{"name":"Ada","email":"ada@example.com","phone":"555-0101","room_name":"Deluxe King","check_in":"2026-01-22","check_out":"2026-01-24"}"#;

#[test]
fn migrate_returns_success_with_valid_env() {
    let dir = TempDir::new().expect("tempdir");
    with_store(dir.path(), || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("CONCIERGE_DATABASE_URL", "postgres://localhost/hotel")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = TempDir::new().expect("tempdir");
    with_store(dir.path(), || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(
            first_payload["message"],
            "hotel reference data present: 9 room categories, 45 room units, 68 service menu items (122 rows inserted)"
        );

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        assert_eq!(
            second_payload["message"],
            "hotel reference data present: 9 room categories, 45 room units, 68 service menu items (0 rows inserted)"
        );
    });
}

#[test]
fn doctor_fails_until_the_store_is_seeded() {
    let dir = TempDir::new().expect("tempdir");
    with_store(dir.path(), || {
        let unseeded = doctor::run(true);
        assert_eq!(unseeded.exit_code, 6);
        let report = parse_payload(&unseeded.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][1]["name"], "database_connectivity");
        assert_eq!(report["checks"][1]["status"], "pass");
        assert_eq!(report["checks"][2]["status"], "fail");
        assert_eq!(report["checks"][3]["status"], "skipped");

        assert_eq!(seed::run().exit_code, 0);
        let booked = tool::run("finalize_hotel_booking", Some(BOOKING_ARGS));
        assert_eq!(booked.exit_code, 0, "{}", booked.output);

        let healthy = doctor::run(true);
        assert_eq!(healthy.exit_code, 0, "{}", healthy.output);
        let report = parse_payload(&healthy.output);
        assert_eq!(report["overall_status"], "pass");
        assert_eq!(report["checks"][3]["name"], "billing_mirror");
    });
}

#[test]
fn tool_books_a_room_and_writes_its_bill_artifact() {
    let dir = TempDir::new().expect("tempdir");
    with_store(dir.path(), || {
        assert_eq!(seed::run().exit_code, 0);

        let result = tool::run("finalize_hotel_booking", Some(BOOKING_ARGS));
        assert_eq!(result.exit_code, 0, "{}", result.output);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "tool");
        assert_eq!(
            payload["message"],
            "SUCCESS: Booking #1 confirmed. Deluxe King room 101 from 2026-01-22 to 2026-01-24 (2 nights). Total: 32460.00"
        );

        let artifact = dir.path().join("bills").join("bill_booking_1.json");
        let bill: Value =
            serde_json::from_str(&std::fs::read_to_string(artifact).expect("bill artifact"))
                .expect("bill json");
        assert_eq!(bill["invoice_details"]["room_number"], 101);

        let cancelled = tool::run("cancel_hotel_booking", Some(r#"{"booking_id":1}"#));
        assert_eq!(cancelled.exit_code, 0, "{}", cancelled.output);
        assert!(!dir.path().join("bills").join("bill_booking_1.json").exists());
    });
}

#[test]
fn tool_failures_carry_the_status_token_and_exit_code() {
    let dir = TempDir::new().expect("tempdir");
    with_store(dir.path(), || {
        assert_eq!(seed::run().exit_code, 0);

        let unknown = tool::run("book_flight", None);
        assert_eq!(unknown.exit_code, 7);
        let payload = parse_payload(&unknown.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "error");

        let missing = tool::run(
            "check_room_availability",
            Some(r#"{"room_type":"Penthouse","check_in":"2026-01-22","check_out":"2026-01-24"}"#),
        );
        assert_eq!(missing.exit_code, 7);
        assert_eq!(parse_payload(&missing.output)["error_class"], "not_found");
    });
}

#[test]
fn tool_list_prints_function_definitions() {
    let dir = TempDir::new().expect("tempdir");
    with_store(dir.path(), || {
        let result = tool::list();
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        let definitions: Value = serde_json::from_str(payload["message"].as_str().unwrap_or("[]"))
            .expect("definitions json");
        assert_eq!(definitions.as_array().map(Vec::len), Some(8));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_store(dir: &Path, test_fn: impl FnOnce()) {
    let url = format!("sqlite://{}", dir.join("hotel.db").display());
    let bills = dir.join("bills").display().to_string();
    let vars = [
        ("CONCIERGE_DATABASE_URL", url.as_str()),
        ("CONCIERGE_BILLING_MIRROR_DIR", bills.as_str()),
    ];
    with_env(&vars, test_fn);
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CONCIERGE_DATABASE_URL",
        "CONCIERGE_DATABASE_MAX_CONNECTIONS",
        "CONCIERGE_DATABASE_TIMEOUT_SECS",
        "CONCIERGE_BILLING_MIRROR_DIR",
        "CONCIERGE_BOOKING_DEFAULT_YEAR",
        "CONCIERGE_LLM_PROVIDER",
        "CONCIERGE_LLM_API_KEY",
        "CONCIERGE_LLM_BASE_URL",
        "CONCIERGE_LLM_MODEL",
        "CONCIERGE_LOGGING_LEVEL",
        "CONCIERGE_LOGGING_FORMAT",
        "CONCIERGE_LOG_LEVEL",
        "CONCIERGE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
