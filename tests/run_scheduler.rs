// tests/run_scheduler.rs

mod common;

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jobgraph::engine::{RunOptions, Scheduler};
use jobgraph::errors::JobgraphError;
use jobgraph::exec::OutputMode;

use common::{
    capture, init_tracing, line_index, sh, with_timeout, ConfigFileBuilder, JobConfigBuilder,
    RecordingExecutor,
};

type TestResult = Result<(), Box<dyn Error>>;

fn echo_job(text: &str) -> JobConfigBuilder {
    JobConfigBuilder::new().step("say", &format!("echo {text}"))
}

#[tokio::test]
async fn dependency_runs_before_dependent() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_job("1", echo_job("1").build())
        .with_job("2", echo_job("2").needs("1").build())
        .build();
    let (out, stdout) = capture();

    let scheduler = Scheduler::new(sh(), RunOptions::default());
    with_timeout(scheduler.run(&cfg, stdout, None)).await?;

    assert_eq!(out.contents(), "1\n2\n");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn diamond_respects_every_edge() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_job("a", echo_job("a").build())
        .with_job("b", echo_job("b").needs("a").build())
        .with_job("c", echo_job("c").needs("a").build())
        .with_job("d", echo_job("d").needs("b").needs("c").build())
        .build();
    let (out, stdout) = capture();

    let scheduler = Scheduler::new(sh(), RunOptions::default());
    with_timeout(scheduler.run(&cfg, stdout, None)).await?;

    let text = out.contents();
    assert_eq!(text.lines().count(), 4);
    let (a, b, c, d) = (
        line_index(&text, "a"),
        line_index(&text, "b"),
        line_index(&text, "c"),
        line_index(&text, "d"),
    );
    assert!(a < b && a < c, "a must precede b and c:\n{text}");
    assert!(b < d && c < d, "d must follow b and c:\n{text}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_jobs_run_concurrently() -> TestResult {
    init_tracing();
    let mut builder = ConfigFileBuilder::new();
    for i in 0..4 {
        builder = builder.with_job(&format!("sleep{i}"), JobConfigBuilder::new().step("nap", "sleep 1").build());
    }
    let cfg = builder.build();
    let (_out, stdout) = capture();

    let scheduler = Scheduler::new(sh(), RunOptions::default());
    let start = Instant::now();
    with_timeout(scheduler.run(&cfg, stdout, None)).await?;

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_millis(2500), "took {elapsed:?}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_worker_serializes_jobs() -> TestResult {
    init_tracing();
    let mut builder = ConfigFileBuilder::new();
    for i in 0..3 {
        builder = builder.with_job(&format!("j{i}"), JobConfigBuilder::new().step("nap", "sleep 0.3").build());
    }
    let cfg = builder.build();
    let (_out, stdout) = capture();

    let scheduler = Scheduler::new(
        sh(),
        RunOptions {
            max_workers: 1,
            ..RunOptions::default()
        },
    );
    let start = Instant::now();
    with_timeout(scheduler.run(&cfg, stdout, None)).await?;

    assert!(start.elapsed() >= Duration::from_millis(900), "took {:?}", start.elapsed());
    Ok(())
}

#[tokio::test]
async fn failure_aborts_the_run_before_dependents_start() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_job(
            "build",
            JobConfigBuilder::new()
                .step("compile", "echo compiling")
                .step("link", "exit 4")
                .step("package", "echo packaging")
                .build(),
        )
        .with_job("deploy", echo_job("deploying").needs("build").build())
        .build();
    let (out, stdout) = capture();
    let recorder = RecordingExecutor::new();

    let scheduler = Scheduler::new(Arc::new(recorder.clone()), RunOptions::default());
    let err = with_timeout(scheduler.run(&cfg, stdout, None))
        .await
        .unwrap_err();

    match err {
        JobgraphError::StepFailed { job, step, code } => {
            assert_eq!(job, "build");
            assert_eq!(step, "link");
            assert_eq!(code, 4);
        }
        other => panic!("expected StepFailed, got {other:?}"),
    }
    assert_eq!(out.contents(), "compiling\n");
    assert_eq!(recorder.started(), vec!["echo compiling", "exit 4"]);
    Ok(())
}

#[tokio::test]
async fn steps_of_a_job_run_in_declaration_order() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_job(
            "only",
            JobConfigBuilder::new()
                .step("one", "echo one")
                .step("two", "echo two")
                .step("three", "echo three")
                .build(),
        )
        .build();
    let (out, stdout) = capture();
    let recorder = RecordingExecutor::new();

    let scheduler = Scheduler::new(Arc::new(recorder.clone()), RunOptions::default());
    with_timeout(scheduler.run(&cfg, stdout, None)).await?;

    assert_eq!(out.contents(), "one\ntwo\nthree\n");
    assert_eq!(recorder.started(), vec!["echo one", "echo two", "echo three"]);
    Ok(())
}

#[tokio::test]
async fn build_errors_surface_before_anything_runs() {
    init_tracing();
    let recorder = RecordingExecutor::new();
    let scheduler = Scheduler::new(Arc::new(recorder.clone()), RunOptions::default());

    let cycle = ConfigFileBuilder::new()
        .with_job("free", echo_job("free").build())
        .with_job("x", echo_job("x").needs("y").build())
        .with_job("y", echo_job("y").needs("x").build())
        .build();
    let (_out, stdout) = capture();
    let err = scheduler.run(&cycle, stdout, None).await.unwrap_err();
    assert_eq!(err.to_string(), "detected a circular dependency: x->y->x");

    let missing = ConfigFileBuilder::new()
        .with_job("a", echo_job("a").needs("ghost").build())
        .build();
    let (_out, stdout) = capture();
    let err = scheduler.run(&missing, stdout, None).await.unwrap_err();
    assert!(matches!(
        err,
        JobgraphError::DependencyNotFound { ref job, ref dependency } if job == "a" && dependency == "ghost"
    ));

    let (_out, stdout) = capture();
    let err = scheduler
        .run(&ConfigFileBuilder::new().build(), stdout, None)
        .await
        .unwrap_err();
    assert!(matches!(err, JobgraphError::NoJobs));

    assert!(recorder.started().is_empty());
}

#[tokio::test]
async fn missing_stdout_fails_the_run() {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_job("a", echo_job("a").build())
        .build();

    let scheduler = Scheduler::new(sh(), RunOptions::default());
    let err = with_timeout(scheduler.run(&cfg, None, None)).await.unwrap_err();
    assert!(matches!(err, JobgraphError::MissingStdout));
}

#[tokio::test]
async fn prefixed_output_names_worker_and_job() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_job("first", echo_job("hello").build())
        .with_job("second", echo_job("world").needs("first").build())
        .build();
    let (out, stdout) = capture();

    let scheduler = Scheduler::new(
        sh(),
        RunOptions {
            max_workers: 1,
            output_mode: OutputMode::Prefixed,
        },
    );
    with_timeout(scheduler.run(&cfg, stdout, None)).await?;

    assert_eq!(
        out.contents(),
        "[worker=0,job=first] hello\n[worker=0,job=second] world\n"
    );
    Ok(())
}

#[tokio::test]
async fn stderr_goes_to_its_own_sink() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_job(
            "noisy",
            JobConfigBuilder::new()
                .step("both", "echo to-out && echo to-err 1>&2")
                .build(),
        )
        .build();
    let (out, stdout) = capture();
    let (err, stderr) = capture();

    let scheduler = Scheduler::new(sh(), RunOptions::default());
    with_timeout(scheduler.run(&cfg, stdout, stderr)).await?;

    assert_eq!(out.contents(), "to-out\n");
    assert_eq!(err.contents(), "to-err\n");
    Ok(())
}

#[tokio::test]
async fn step_env_reaches_the_process() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_job(
            "env",
            JobConfigBuilder::new()
                .name("Environment")
                .step_with_env("show", "echo $GREETING $JOBGRAPH_JOB_NAME", &[("GREETING", "hey")])
                .build(),
        )
        .build();
    let (out, stdout) = capture();

    let scheduler = Scheduler::new(sh(), RunOptions::default());
    with_timeout(scheduler.run(&cfg, stdout, None)).await?;

    assert_eq!(out.contents(), "hey Environment\n");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn capped_pool_drains_more_jobs_than_the_result_queue_minimum() -> TestResult {
    init_tracing();
    let jobs = jobgraph::engine::scheduler::RESULT_QUEUE_SIZE + 76;
    let mut builder = ConfigFileBuilder::new();
    for i in 0..jobs {
        builder = builder.with_job(&format!("job{i:05}"), JobConfigBuilder::new().step("noop", "true").build());
    }
    let cfg = builder.build();
    let (_out, stdout) = capture();

    let scheduler = Scheduler::new(
        sh(),
        RunOptions {
            max_workers: 1,
            ..RunOptions::default()
        },
    );
    tokio::time::timeout(Duration::from_secs(60), scheduler.run(&cfg, stdout, None))
        .await
        .map_err(|_| "run wedged with a full result queue")??;
    Ok(())
}
