use std::io::Write;

use serial_test::serial;

use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.templates.root, PathBuf::from("templates"));
    assert!(settings.templates.freshness_check);
    assert!(!settings.templates.strict);
    assert!(!settings.workers.single_flight);
    assert_eq!(settings.workers.queue_depth.get(), 256);
    assert_eq!(settings.timeouts.reply, Duration::from_secs(5));
    assert_eq!(settings.timeouts.compile, Duration::from_secs(30));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.workers.compiler_workers = Some(2);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        compiler_workers: Some(6),
        templates: TemplateOverrides {
            log_level: Some("debug".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.workers.compiler_workers.get(), 6);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        templates: TemplateOverrides {
            log_json: Some(true),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_values_are_rejected() {
    let mut raw = RawSettings::default();
    raw.workers.compiler_workers = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero workers");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "workers.compiler_workers",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.timeouts.reply_ms = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero reply timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "timeouts.reply_ms",
            ..
        }
    ));
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("chatty".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["sagoma"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "sagoma",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--templates-root",
        "/srv/templates",
        "--log-json=true",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.templates.templates_root.as_deref(),
                Some(std::path::Path::new("/srv/templates"))
            );
            assert_eq!(serve.overrides.templates.log_json, Some(true));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "sagoma",
        "render",
        "mail/welcome.hbs",
        "--data",
        r#"{"name":"world"}"#,
    ]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert_eq!(render.template_id, "mail/welcome.hbs");
            assert_eq!(render.data.as_deref(), Some(r#"{"name":"world"}"#));
            assert!(render.data_file.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn render_data_sources_conflict() {
    let result = CliArgs::try_parse_from([
        "sagoma",
        "render",
        "a.hbs",
        "--data",
        "{}",
        "--data-file",
        "data.json",
    ]);
    assert!(result.is_err());
}

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
#[serial]
fn file_values_are_loaded_and_cli_wins() {
    let file = config_file(
        r#"
[server]
port = 4100

[templates]
auto_update = false
strict = true

[workers]
compiler_workers = 3
single_flight = true
"#,
    );

    let args = CliArgs::parse_from([
        "sagoma",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "serve",
        "--server-port",
        "4200",
    ]);
    let settings = load(&args).expect("settings");

    assert_eq!(settings.server.addr.port(), 4200);
    assert!(!settings.templates.freshness_check);
    assert!(settings.templates.strict);
    assert_eq!(settings.workers.compiler_workers.get(), 3);
    assert!(settings.workers.single_flight);
}

#[test]
#[serial]
fn environment_overrides_file() {
    let file = config_file(
        r#"
[timeouts]
reply_ms = 1000
"#,
    );

    // SAFETY: serialized with every other test touching the environment.
    unsafe { std::env::set_var("SAGOMA__TIMEOUTS__REPLY_MS", "2500") };
    let args = CliArgs::parse_from([
        "sagoma",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
    ]);
    let result = load(&args);
    unsafe { std::env::remove_var("SAGOMA__TIMEOUTS__REPLY_MS") };

    let settings = result.expect("settings");
    assert_eq!(settings.timeouts.reply, Duration::from_millis(2500));
}
