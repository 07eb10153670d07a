mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use sagoma::application::messages::RenderRequest;
use sagoma::application::service::{ServiceOptions, TemplateService};
use sagoma::application::source::TemplateSource;
use sagoma::domain::{FailureKind, SourceError, TemplateId};
use sagoma::infra::engine::HandlebarsEngine;
use sagoma::infra::source::FsTemplateSource;
use serde_json::json;
use time::OffsetDateTime;

use common::data;

fn write_with_mtime(path: &Path, contents: &[u8], modified: SystemTime) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write template");
    let file = fs::File::options()
        .write(true)
        .open(path)
        .expect("open template");
    file.set_modified(modified).expect("set mtime");
}

fn base_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

#[tokio::test]
async fn reads_text_and_modification_time() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_with_mtime(
        &dir.path().join("mail/welcome.hbs"),
        b"Welcome, {{name}}",
        base_time(),
    );
    let source = FsTemplateSource::new(dir.path());
    let id = TemplateId::new("mail/welcome.hbs");

    let document = source.read_source(&id).await.expect("document");
    assert_eq!(document.text, "Welcome, {{name}}");
    assert_eq!(document.last_modified, OffsetDateTime::from(base_time()));
    assert_eq!(
        source.last_modified(&id).await.expect("timestamp"),
        OffsetDateTime::from(base_time())
    );
}

#[tokio::test]
async fn missing_files_and_directories_are_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir(dir.path().join("partials")).expect("mkdir");
    let source = FsTemplateSource::new(dir.path());

    for id in ["absent.hbs", "partials"] {
        let err = source
            .last_modified(&TemplateId::new(id))
            .await
            .expect_err("not a template");
        assert!(matches!(err, SourceError::NotFound { .. }), "{id}: {err}");
    }
}

#[tokio::test]
async fn path_traversal_is_not_found() {
    let outer = tempfile::tempdir().expect("tempdir");
    let root = outer.path().join("templates");
    fs::create_dir(&root).expect("mkdir root");
    write_with_mtime(&outer.path().join("secret.hbs"), b"secret", base_time());
    let source = FsTemplateSource::new(&root);

    let err = source
        .read_source(&TemplateId::new("../secret.hbs"))
        .await
        .expect_err("escape rejected");
    assert!(matches!(err, SourceError::NotFound { .. }));
}

#[tokio::test]
async fn invalid_utf8_is_an_encoding_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_with_mtime(&dir.path().join("bin.hbs"), &[0xff, 0xfe, 0x00], base_time());
    let source = FsTemplateSource::new(dir.path());

    let err = source
        .read_source(&TemplateId::new("bin.hbs"))
        .await
        .expect_err("not utf-8");
    assert!(matches!(err, SourceError::Encoding { .. }));
}

#[tokio::test]
async fn editing_a_file_is_picked_up_on_next_render() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("hello.hbs");
    write_with_mtime(&path, b"Hello, {{name}}!", base_time());

    let service = TemplateService::start(
        ServiceOptions::default(),
        Arc::new(FsTemplateSource::new(dir.path())),
        Arc::new(HandlebarsEngine::default()),
    );
    let router = service.router();
    let request = || RenderRequest::new("hello.hbs", data(json!({ "name": "world" })));

    let first = router.render(request()).await;
    assert_eq!(first.output.as_deref(), Some("Hello, world!"));

    write_with_mtime(&path, b"Hi, {{name}}!", base_time() + Duration::from_secs(10));
    let second = router.render(request()).await;
    assert_eq!(second.output.as_deref(), Some("Hi, world!"));
    assert_eq!(
        service
            .store()
            .get(&TemplateId::new("hello.hbs"))
            .expect("entry")
            .compiled_at(),
        OffsetDateTime::from(base_time() + Duration::from_secs(10))
    );

    fs::remove_file(&path).expect("remove template");
    let third = router.render(request()).await;
    assert_eq!(third.output.as_deref(), Some("Hi, world!"));

    router.flush(Default::default()).await;
    let fourth = router.render(request()).await;
    assert_eq!(fourth.failure, Some(FailureKind::NotFound));
}
