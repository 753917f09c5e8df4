// tests/engine_failures.rs

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use jobstep_agent::config::JobConfig;
use jobstep_agent::engine::{Engine, ExecOptions};
use jobstep_agent::reporter::{DefaultReporter, Publisher, PublisherSettings, Reporter};
use jobstep_agent::types::JobResult;
use jobstep_agent_test_utils::builders::{CmdBuilder, JobBuilder};
use jobstep_agent_test_utils::recording_transport::{RecordedReport, RecordingTransport};
use jobstep_agent_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

async fn run_job(job: JobConfig, options: ExecOptions) -> (JobResult, Vec<RecordedReport>) {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let publisher = Publisher::spawn(
        RecordingTransport::new(delivered.clone()),
        PublisherSettings::default(),
    );
    let reporter = DefaultReporter::new(job.id.clone(), publisher);

    let result = Engine::new(&reporter, options).run(&job).await;
    reporter.shutdown().await;

    let reports = delivered.lock().unwrap().clone();
    (result, reports)
}

fn command_reports<'a>(reports: &'a [RecordedReport], cmd_id: &str) -> Vec<&'a RecordedReport> {
    let path = format!("/commands/{cmd_id}/");
    reports.iter().filter(|r| r.path == path).collect()
}

fn job_terminal_reports<'a>(reports: &'a [RecordedReport], job_id: &str) -> Vec<&'a RecordedReport> {
    let path = format!("/jobsteps/{job_id}/");
    reports
        .iter()
        .filter(|r| r.path == path && r.get("status") == Some("finished"))
        .collect()
}

#[tokio::test]
async fn failing_command_stops_the_job() -> TestResult {
    init_tracing();

    let job = JobBuilder::new("job_fail")
        .with_cmd(CmdBuilder::new("cmd_1", "echo before; exit 2").build())
        .with_cmd(CmdBuilder::new("cmd_2", "echo never").build())
        .build();

    let (result, reports) = with_timeout(run_job(job, ExecOptions::default())).await;
    assert_eq!(result, JobResult::Failed);

    let cmd_1 = command_reports(&reports, "cmd_1");
    assert_eq!(cmd_1.len(), 2);
    assert_eq!(cmd_1[0].get("return_code"), None);
    assert_eq!(cmd_1[1].get("status"), Some("finished"));
    assert_eq!(cmd_1[1].get("return_code"), Some("1"));

    assert!(command_reports(&reports, "cmd_2").is_empty());

    let log: Vec<_> = reports
        .iter()
        .filter(|r| r.path == "/jobsteps/job_fail/logappend/")
        .collect();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].get("text"), Some("before\n"));

    let terminal = job_terminal_reports(&reports, "job_fail");
    assert_eq!(terminal.len(), 1);
    assert_eq!(terminal[0].get("result"), Some("failed"));
    assert_eq!(reports.last(), Some(terminal[0]));
    Ok(())
}

#[tokio::test]
async fn script_with_nul_byte_is_an_infrastructure_failure() -> TestResult {
    init_tracing();

    let job = JobBuilder::new("job_nul")
        .with_cmd(CmdBuilder::new("bad", "echo a\0b").build())
        .with_cmd(CmdBuilder::new("after", "true").build())
        .build();

    let (result, reports) = with_timeout(run_job(job, ExecOptions::default())).await;
    assert_eq!(result, JobResult::Failed);

    let bad = command_reports(&reports, "bad");
    assert_eq!(bad.len(), 2);
    assert_eq!(bad[1].get("return_code"), Some("255"));
    assert!(command_reports(&reports, "after").is_empty());
    assert!(!reports.iter().any(|r| r.path.ends_with("/logappend/")));
    Ok(())
}

#[tokio::test]
async fn missing_interpreter_is_an_infrastructure_failure() -> TestResult {
    init_tracing();

    let job = JobBuilder::new("job_launch")
        .with_cmd(CmdBuilder::new("nointerp", "#!/definitely/not/here\necho hi").build())
        .build();

    let (result, reports) = with_timeout(run_job(job, ExecOptions::default())).await;
    assert_eq!(result, JobResult::Failed);

    let cmd = command_reports(&reports, "nointerp");
    assert_eq!(cmd.last().and_then(|r| r.get("return_code")), Some("255"));
    Ok(())
}

#[tokio::test]
async fn missing_working_directory_is_an_infrastructure_failure() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let job = JobBuilder::new("job_cwd")
        .with_cmd(
            CmdBuilder::new("in_void", "pwd")
                .cwd(dir.path().join("does-not-exist"))
                .build(),
        )
        .build();

    let (result, reports) = with_timeout(run_job(job, ExecOptions::default())).await;
    assert_eq!(result, JobResult::Failed);
    let cmd = command_reports(&reports, "in_void");
    assert_eq!(cmd.last().and_then(|r| r.get("return_code")), Some("255"));
    Ok(())
}

#[tokio::test]
async fn command_past_its_deadline_is_killed_and_fails() -> TestResult {
    init_tracing();

    let job = JobBuilder::new("job_slow")
        .with_cmd(CmdBuilder::new("slow", "echo started; sleep 30").build())
        .build();
    let options = ExecOptions {
        command_timeout: Some(Duration::from_millis(300)),
        ..ExecOptions::default()
    };

    let started = Instant::now();
    let (result, reports) = with_timeout(run_job(job, options)).await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result, JobResult::Failed);

    let slow = command_reports(&reports, "slow");
    assert_eq!(slow.last().and_then(|r| r.get("return_code")), Some("1"));
    assert!(
        reports
            .iter()
            .any(|r| r.path.ends_with("/logappend/") && r.get("text") == Some("started\n"))
    );
    Ok(())
}

#[tokio::test]
async fn bad_artifact_pattern_fails_the_job_after_success_is_reported() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let job = JobBuilder::new("job_glob")
        .with_cmd(
            CmdBuilder::new("build", "true")
                .cwd(dir.path())
                .artifact("[unclosed")
                .build(),
        )
        .with_cmd(CmdBuilder::new("next", "true").build())
        .build();

    let (result, reports) = with_timeout(run_job(job, ExecOptions::default())).await;
    assert_eq!(result, JobResult::Failed);

    let build = command_reports(&reports, "build");
    assert_eq!(build.last().and_then(|r| r.get("return_code")), Some("0"));
    assert!(command_reports(&reports, "next").is_empty());
    assert!(!reports.iter().any(|r| r.path.ends_with("/artifacts/")));
    Ok(())
}

#[tokio::test]
async fn artifacts_are_published_in_pattern_order() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("out/nested"))?;
    std::fs::write(dir.path().join("out/b.xml"), b"b")?;
    std::fs::write(dir.path().join("out/a.xml"), b"a")?;
    std::fs::write(dir.path().join("out/nested/c.xml"), b"c")?;
    std::fs::write(dir.path().join("coverage.txt"), b"cov")?;

    let job = JobBuilder::new("job_art")
        .with_cmd(
            CmdBuilder::new("build", "true")
                .cwd(dir.path())
                .artifact("coverage.txt")
                .artifact("out/*.xml")
                .build(),
        )
        .build();

    let (result, reports) = with_timeout(run_job(job, ExecOptions::default())).await;
    assert_eq!(result, JobResult::Passed);

    let files: Vec<(String, Vec<u8>)> = reports
        .iter()
        .filter(|r| r.path == "/jobsteps/job_art/artifacts/")
        .filter_map(|r| r.file.clone())
        .collect();
    assert_eq!(
        files,
        vec![
            ("coverage.txt".to_string(), b"cov".to_vec()),
            ("a.xml".to_string(), b"a".to_vec()),
            ("b.xml".to_string(), b"b".to_vec()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn empty_job_passes_with_two_job_reports() -> TestResult {
    init_tracing();

    let job = JobBuilder::new("job_empty").build();
    let (result, reports) = with_timeout(run_job(job, ExecOptions::default())).await;
    assert_eq!(result, JobResult::Passed);

    assert_eq!(
        reports,
        vec![
            RecordedReport::new("/jobsteps/job_empty/", &[("status", "in_progress")]),
            RecordedReport::new(
                "/jobsteps/job_empty/",
                &[("status", "finished"), ("result", "passed")]
            ),
        ]
    );
    Ok(())
}
