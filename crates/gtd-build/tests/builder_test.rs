use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use gtd_build::{BuildError, Builder};
use gtd_core::{BranchTag, BranchTagsConfig, BuildOptions};
use gtd_exec::{CommandExecutor, CommandLine, ExecError};
use mockall::mock;
use tempfile::TempDir;

mock! {
    Executor {}

    impl CommandExecutor for Executor {
        async fn exec(&self, cmd: &CommandLine) -> Result<Vec<u8>, ExecError>;
        async fn exec_streaming(&self, cmd: &CommandLine) -> Result<(), ExecError>;
        async fn exec_with_stdin(
            &self,
            cmd: &CommandLine,
            stdin_data: &[u8],
        ) -> Result<Vec<u8>, ExecError>;
    }
}

// ── Fixtures ──

fn failed(command: &str, output: &str) -> ExecError {
    ExecError::CommandFailed {
        command: command.to_owned(),
        output: output.to_owned(),
    }
}

fn work_dir() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    (tmp, root)
}

fn touch(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn options(root: &Path) -> BuildOptions {
    BuildOptions {
        work_dir: Some(root.to_path_buf()),
        toolchain_root: Some(root.join("go")),
        ..Default::default()
    }
}

/// Work dir is not a repository; `--git-dir` is probed exactly once.
fn expect_unversioned(mock: &mut MockExecutor) {
    mock.expect_exec()
        .withf(|cmd| cmd.program == "git" && cmd.has_arg("--git-dir"))
        .times(1)
        .returning(|_| {
            Err(failed(
                "git rev-parse --git-dir",
                "fatal: not a git repository (or any of the parent directories): .git",
            ))
        });
}

fn expect_revision(mock: &mut MockExecutor, branch: &'static str, commit: &'static str) {
    mock.expect_exec()
        .withf(|cmd| cmd.program == "git" && cmd.has_arg("--git-dir"))
        .times(1)
        .returning(|_| Ok(b".git\n".to_vec()));
    mock.expect_exec()
        .withf(|cmd| cmd.program == "git" && cmd.has_arg("--abbrev-ref"))
        .times(1)
        .returning(move |_| Ok(format!("{branch}\n").into_bytes()));
    mock.expect_exec()
        .withf(|cmd| cmd.program == "git" && cmd.args == ["rev-parse", "HEAD"])
        .times(1)
        .returning(move |_| Ok(format!("{commit}\n").into_bytes()));
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

// ── Resolution Tests ──

#[tokio::test]
async fn resolve_fills_defaults_without_vcs() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);

    let builder = Builder::with_executor(options(&root), mock);
    assert!(!builder.is_resolved());

    let resolved = builder.resolve().await.unwrap();
    assert_eq!(resolved.app_name, "app");
    assert_eq!(resolved.work_dir, root);
    assert_eq!(resolved.output_dir, PathBuf::from("_output_"));
    assert_eq!(resolved.builder_image, "golang:1.22-alpine");
    assert_eq!(resolved.tags, vec!["latest"]);
    assert!(resolved.revision.is_none());
    assert!(builder.is_resolved());
}

#[tokio::test]
async fn resolve_runs_once_per_builder() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    expect_revision(&mut mock, "feature-x", "abcdef1234567890");

    let builder = Builder::with_executor(options(&root), mock);
    let first = builder.resolve().await.unwrap();
    let second = builder.resolve().await.unwrap();

    assert!(std::ptr::eq(first, second));
    assert_eq!(first.tags, vec!["feature-x", "feature-x-abcdef12"]);
}

#[tokio::test]
async fn stages_share_one_resolution() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);

    let builder = Builder::with_executor(options(&root), mock).with_http_client(http_client());
    builder.clear_app().await.unwrap();
    builder.push_trigger().await.unwrap();
    builder.clear_app().await.unwrap();
}

#[tokio::test]
async fn branch_entry_replaces_derived_tags() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    expect_revision(&mut mock, "main", "0123456789abcdef");

    let mut branch_tags = BranchTagsConfig::default();
    branch_tags.insert(
        "main",
        BranchTag {
            server: "registry.example.com".to_owned(),
            organization: "acme".to_owned(),
            tags: vec!["stable".to_owned()],
            ..Default::default()
        },
    );
    let builder = Builder::with_executor(
        BuildOptions {
            branch_tags,
            registry_org: Some("ignored".to_owned()),
            ..options(&root)
        },
        mock,
    );

    let resolved = builder.resolve().await.unwrap();
    assert_eq!(resolved.tags, vec!["stable"]);
    assert_eq!(
        resolved.image_refs(),
        vec!["registry.example.com/acme/app:stable"]
    );
}

#[tokio::test]
async fn revision_probe_failure_is_fatal() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|cmd| cmd.has_arg("--git-dir"))
        .times(1)
        .returning(|_| Err(failed("git rev-parse --git-dir", "fatal: detected dubious ownership")));

    let builder = Builder::with_executor(options(&root), mock);
    let err = builder.resolve().await.unwrap_err();

    assert!(matches!(err, BuildError::Revision(_)));
    assert!(!builder.is_resolved());
}

// ── BuildApp Tests ──

#[tokio::test]
async fn build_app_in_container_then_copies_resources() {
    let (_tmp, root) = work_dir();
    touch(&root, "conf/app.conf", "port=80");

    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);
    let mount = format!("{}:/usr/src/app", root.display());
    mock.expect_exec_streaming()
        .withf(move |cmd| {
            cmd.program == "docker"
                && cmd.has_arg("golang:1.22-alpine")
                && cmd.has_arg(&mount)
                && cmd.has_arg("_output_/app")
        })
        .times(1)
        .returning(|_| Ok(()));

    let builder = Builder::with_executor(
        BuildOptions {
            resources: vec!["conf/*.conf".to_owned()],
            ..options(&root)
        },
        mock,
    );
    builder.build_app().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(root.join("_output_/conf/app.conf")).unwrap(),
        "port=80"
    );
}

#[tokio::test]
async fn build_app_local_runs_go_in_work_dir() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);

    let expected_dir = root.clone();
    mock.expect_exec_streaming()
        .withf(move |cmd| {
            cmd.program == "go"
                && cmd.args == ["build", "-o", "_output_/billing", "-v"]
                && cmd.current_dir.as_deref() == Some(expected_dir.as_path())
                && cmd.envs.iter().any(|(k, _)| k == "GOPATH")
        })
        .times(1)
        .returning(|_| Ok(()));

    let builder = Builder::with_executor(
        BuildOptions {
            app_name: Some("billing".to_owned()),
            builder_image: Some("local".to_owned()),
            verbose: true,
            ..options(&root)
        },
        mock,
    );
    builder.build_app().await.unwrap();
}

#[tokio::test]
async fn failed_compile_skips_resources() {
    let (_tmp, root) = work_dir();
    touch(&root, "app.conf", "x");

    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);
    mock.expect_exec_streaming()
        .times(1)
        .returning(|_| Err(failed("docker run", "exit status: 2")));

    let builder = Builder::with_executor(
        BuildOptions {
            resources: vec!["*.conf".to_owned()],
            ..options(&root)
        },
        mock,
    );

    let err = builder.build_app().await.unwrap_err();
    assert!(matches!(err, BuildError::Exec(_)));
    assert!(!root.join("_output_/app.conf").exists());
}

// ── BuildImage Tests ──

fn image_options(root: &Path) -> BuildOptions {
    BuildOptions {
        registry_org: Some("acme".to_owned()),
        ..options(root)
    }
}

#[tokio::test]
async fn build_image_requires_organization() {
    let (_tmp, root) = work_dir();
    touch(&root, "_output_/app", "bin");

    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);

    let builder = Builder::with_executor(options(&root), mock);
    let err = builder.build_image().await.unwrap_err();

    assert!(err.to_string().contains("organization could not be empty"));
}

#[tokio::test]
async fn build_image_before_build_app_fails() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);

    let builder = Builder::with_executor(image_options(&root), mock);
    let err = builder.build_image().await.unwrap_err();

    assert!(matches!(err, BuildError::OutputMissing(_)));
    assert!(err.to_string().contains("build app first"));
}

#[tokio::test]
async fn build_image_output_must_be_dir() {
    let (_tmp, root) = work_dir();
    touch(&root, "_output_", "not a dir");

    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);

    let builder = Builder::with_executor(image_options(&root), mock);
    let err = builder.build_image().await.unwrap_err();
    assert!(matches!(err, BuildError::OutputNotDir(_)));
}

#[tokio::test]
async fn build_image_binary_missing() {
    let (_tmp, root) = work_dir();
    std::fs::create_dir_all(root.join("_output_")).unwrap();

    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);

    let builder = Builder::with_executor(image_options(&root), mock);
    let err = builder.build_image().await.unwrap_err();
    assert!(matches!(err, BuildError::BinaryMissing(_)));
}

#[tokio::test]
async fn build_image_binary_is_dir() {
    let (_tmp, root) = work_dir();
    std::fs::create_dir_all(root.join("_output_/app")).unwrap();

    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);

    let builder = Builder::with_executor(image_options(&root), mock);
    let err = builder.build_image().await.unwrap_err();
    assert!(matches!(err, BuildError::BinaryIsDir(_)));
}

#[tokio::test]
async fn build_image_renders_template_and_builds_every_tag() {
    let (_tmp, root) = work_dir();
    touch(&root, "_output_/api", "bin");
    touch(&root, "_output_/.docker/config.json", "{}");
    touch(
        &root,
        "deploy/Dockerfile.tmpl",
        "FROM {{ app_image }}\nCOPY {{ app_name }} /{{ app_name }}\n",
    );

    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);
    let output = root.join("_output_");
    mock.expect_exec_streaming()
        .withf(move |cmd| {
            cmd.program == "docker"
                && cmd.args
                    == [
                        "build",
                        "-t",
                        "acme/api:v1",
                        "-t",
                        "acme/api:latest",
                        ".",
                    ]
                && cmd.current_dir.as_deref() == Some(output.as_path())
        })
        .times(1)
        .returning(|_| Ok(()));

    let builder = Builder::with_executor(
        BuildOptions {
            app_name: Some("api".to_owned()),
            app_image: Some("debian:stable-slim".to_owned()),
            dockerfile_template: Some(root.join("deploy/Dockerfile.tmpl")),
            tags: vec!["v1".to_owned(), "latest".to_owned()],
            ..image_options(&root)
        },
        mock,
    );
    builder.build_image().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(root.join("_output_/Dockerfile")).unwrap(),
        "FROM debian:stable-slim\nCOPY api /api\n"
    );
    assert!(!root.join("_output_/.docker").exists());
}

// ── PushImage Tests ──

#[tokio::test]
async fn push_image_logs_in_then_pushes_each_tag() {
    let (_tmp, root) = work_dir();
    touch(&root, "_output_/.docker/config.json", "{}");

    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);
    mock.expect_exec_with_stdin()
        .withf(|cmd, data| {
            cmd.has_arg("login")
                && cmd.has_arg("--password-stdin")
                && cmd.has_arg("registry.example.com")
                && !cmd.has_arg("s3cret")
                && data.to_vec() == b"s3cret"
        })
        .times(1)
        .returning(|_, _| Ok(b"Login Succeeded\n".to_vec()));
    mock.expect_exec_streaming()
        .withf(|cmd| cmd.has_arg("chown") && cmd.has_arg("1000:1000"))
        .times(1)
        .returning(|_| Ok(()));
    mock.expect_exec_streaming()
        .withf(|cmd| cmd.has_arg("push") && cmd.has_arg("registry.example.com/acme/app:v1"))
        .times(1)
        .returning(|_| Ok(()));
    mock.expect_exec_streaming()
        .withf(|cmd| cmd.has_arg("push") && cmd.has_arg("registry.example.com/acme/app:v2"))
        .times(1)
        .returning(|_| Ok(()));

    let builder = Builder::with_executor(
        BuildOptions {
            registry_host: Some("registry.example.com".to_owned()),
            registry_username: Some("ci".to_owned()),
            registry_password: Some(String::from("s3cret").into()),
            dind_user: Some("1000:1000".to_owned()),
            tags: vec!["v1".to_owned(), "v2".to_owned()],
            ..image_options(&root)
        },
        mock,
    );
    builder.push_image().await.unwrap();

    assert!(!root.join("_output_/.docker").exists());
}

#[tokio::test]
async fn push_image_without_credentials_skips_login() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);
    mock.expect_exec_streaming()
        .withf(|cmd| cmd.has_arg("push") && cmd.has_arg("acme/app:latest"))
        .times(1)
        .returning(|_| Ok(()));

    let builder = Builder::with_executor(image_options(&root), mock);
    builder.push_image().await.unwrap();
}

#[tokio::test]
async fn push_image_requires_organization() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);

    let builder = Builder::with_executor(options(&root), mock);
    let err = builder.push_image().await.unwrap_err();

    assert!(err.to_string().contains("organization could not be empty"));
}

#[tokio::test]
async fn push_image_stops_at_first_failed_tag() {
    let (_tmp, root) = work_dir();
    touch(&root, "_output_/.docker/config.json", "{}");

    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);
    mock.expect_exec_streaming()
        .withf(|cmd| cmd.has_arg("acme/app:v1"))
        .times(1)
        .returning(|_| Err(failed("docker push", "denied: requested access")));

    let builder = Builder::with_executor(
        BuildOptions {
            tags: vec!["v1".to_owned(), "v2".to_owned()],
            ..image_options(&root)
        },
        mock,
    );

    let err = builder.push_image().await.unwrap_err();
    assert!(err.to_string().contains("denied"));
    assert!(!root.join("_output_/.docker").exists());
}

// ── PushTrigger Tests ──

#[derive(Default)]
struct Hits {
    ok: AtomicUsize,
    after: AtomicUsize,
}

async fn serve(hits: Arc<Hits>) -> String {
    let app = Router::new()
        .route(
            "/ok",
            get(|State(hits): State<Arc<Hits>>| async move {
                hits.ok.fetch_add(1, Ordering::SeqCst);
                "queued"
            }),
        )
        .route(
            "/fail",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/created",
            get(|| async { (StatusCode::CREATED, "made") }),
        )
        .route(
            "/after",
            get(|State(hits): State<Arc<Hits>>| async move {
                hits.after.fetch_add(1, Ordering::SeqCst);
                "late"
            }),
        )
        .with_state(hits);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn trigger_builder(root: &Path, uris: Vec<String>) -> Builder<MockExecutor> {
    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);
    Builder::with_executor(
        BuildOptions {
            trigger_uris: uris,
            ..options(root)
        },
        mock,
    )
    .with_http_client(http_client())
}

#[tokio::test]
async fn push_trigger_calls_each_uri_in_order() {
    let (_tmp, root) = work_dir();
    let hits = Arc::new(Hits::default());
    let base = serve(hits.clone()).await;

    let builder = trigger_builder(
        &root,
        vec![
            format!("{base}/ok"),
            "ftp://files.example.com/hook".to_owned(),
            format!("{base}/after"),
        ],
    );
    builder.push_trigger().await.unwrap();

    assert_eq!(hits.ok.load(Ordering::SeqCst), 1);
    assert_eq!(hits.after.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn push_trigger_halts_on_non_200() {
    let (_tmp, root) = work_dir();
    let hits = Arc::new(Hits::default());
    let base = serve(hits.clone()).await;

    let builder = trigger_builder(
        &root,
        vec![
            format!("{base}/ok"),
            format!("{base}/fail"),
            format!("{base}/after"),
        ],
    );
    let err = builder.push_trigger().await.unwrap_err();

    match &err {
        BuildError::TriggerStatus { uri, status, body } => {
            assert!(uri.ends_with("/fail"));
            assert_eq!(*status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("status code: 500"));
    assert_eq!(hits.ok.load(Ordering::SeqCst), 1);
    assert_eq!(hits.after.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn push_trigger_treats_other_2xx_as_failure() {
    let (_tmp, root) = work_dir();
    let base = serve(Arc::new(Hits::default())).await;

    let builder = trigger_builder(&root, vec![format!("{base}/created")]);
    let err = builder.push_trigger().await.unwrap_err();

    assert!(matches!(err, BuildError::TriggerStatus { status: 201, .. }));
}

// ── Clear Tests ──

#[tokio::test]
async fn clear_app_removes_output_dir() {
    let (_tmp, root) = work_dir();
    touch(&root, "_output_/app", "bin");
    touch(&root, "main.go", "package main");

    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);

    let builder = Builder::with_executor(options(&root), mock);
    builder.clear_app().await.unwrap();

    assert!(!root.join("_output_").exists());
    assert!(root.join("main.go").exists());
}

#[tokio::test]
async fn clear_app_missing_output_is_ok() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);

    let builder = Builder::with_executor(options(&root), mock);
    builder.clear_app().await.unwrap();
}

#[tokio::test]
async fn clear_app_refuses_empty_and_root_output() {
    for output_dir in ["", "/", ".", "src/..", ".."] {
        let (_tmp, root) = work_dir();
        touch(&root, "main.go", "package main");
        touch(&root, "src/lib.go", "package src");

        let mut mock = MockExecutor::new();
        expect_unversioned(&mut mock);

        let builder = Builder::with_executor(
            BuildOptions {
                output_dir: Some(PathBuf::from(output_dir)),
                ..options(&root)
            },
            mock,
        );
        builder.clear_app().await.unwrap();
        assert!(root.join("main.go").exists(), "output_dir {output_dir:?}");
        assert!(root.join("src/lib.go").exists(), "output_dir {output_dir:?}");
    }
}

#[tokio::test]
async fn clear_image_requires_organization() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);

    let builder = Builder::with_executor(options(&root), mock);
    let err = builder.clear_image().await.unwrap_err();

    assert!(err.to_string().contains("organization could not be empty"));
}

#[tokio::test]
async fn clear_image_removes_all_tags_at_once() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);
    mock.expect_exec()
        .withf(|cmd| {
            cmd.program == "docker" && cmd.args == ["rmi", "acme/app:v1", "acme/app:v2"]
        })
        .times(1)
        .returning(|_| Ok(b"Untagged: acme/app:v1\n".to_vec()));

    let builder = Builder::with_executor(
        BuildOptions {
            tags: vec!["v1".to_owned(), "v2".to_owned()],
            ..image_options(&root)
        },
        mock,
    );
    builder.clear_image().await.unwrap();
}

#[tokio::test]
async fn clear_image_failure_carries_docker_output() {
    let (_tmp, root) = work_dir();
    let mut mock = MockExecutor::new();
    expect_unversioned(&mut mock);
    mock.expect_exec()
        .withf(|cmd| cmd.has_arg("rmi"))
        .times(1)
        .returning(|_| {
            Err(failed(
                "docker rmi acme/app:latest",
                "Error: No such image: acme/app:latest",
            ))
        });

    let builder = Builder::with_executor(image_options(&root), mock);
    let err = builder.clear_image().await.unwrap_err();

    match err {
        BuildError::RemoveImages { output } => assert!(output.contains("No such image")),
        other => panic!("unexpected error: {other:?}"),
    }
}
