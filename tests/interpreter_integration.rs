//! Interpreter behaviour across async operations, faults and long chains.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use undertow::prelude::*;
use undertow::testing::CallCounter;

fn read(label: &'static str, value: i32, counter: &CallCounter) -> Effect<i32, String> {
    let counter = counter.clone();
    Effect::command(
        label,
        move || {
            counter.hit();
            async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok::<_, String>(value)
            }
        },
        Effect::success,
    )
}

#[tokio::test]
async fn test_two_commands_resolve_to_second_value() {
    let counter = CallCounter::new();
    let second = counter.clone();
    let effect = read("first", 20, &counter).and_then(move |a| {
        read("second", 22, &second).and_then(move |b| Effect::success(a + b))
    });

    assert_eq!(counter.count(), 0);
    assert_eq!(run_effect(effect).await, Ok(42));
    assert_eq!(counter.count(), 2);
}

#[tokio::test]
async fn test_operation_fault_skips_remaining_commands() {
    let counter = CallCounter::new();
    let later = counter.clone();
    let continuation_ran = CallCounter::new();
    let seen = continuation_ran.clone();

    let effect = Effect::<i32, String>::command(
        "explode",
        || async { Err::<i32, _>("disk on fire".to_string()) },
        move |n: i32| {
            seen.hit();
            Effect::success(n)
        },
    )
    .and_then(move |n| read("after", n, &later));

    let (result, trace) = Interpreter::new().run_traced(effect).await;
    assert_eq!(result, Err("disk on fire".to_string()));
    assert_eq!(trace.executed(), [Label::new("explode")]);
    assert_eq!(continuation_ran.count(), 0);
    assert_eq!(counter.count(), 0);
}

#[tokio::test]
async fn test_continuation_fault_skips_remaining_commands() {
    let counter = CallCounter::new();
    let later = counter.clone();

    let effect = Effect::<i32, String>::try_command(
        "parse",
        || async { Ok::<_, String>("forty-two".to_string()) },
        |raw: String| {
            raw.parse::<i32>()
                .map(Effect::success)
                .map_err(|_| format!("not a number: {}", raw))
        },
    )
    .and_then(move |n| read("after", n, &later));

    let (result, trace) = Interpreter::new().run_traced(effect).await;
    assert_eq!(result, Err("not a number: forty-two".to_string()));
    assert_eq!(trace.fault().map(|f| f.phase), Some(Phase::Continuation));
    assert_eq!(counter.count(), 0);
}

#[tokio::test]
async fn test_commands_run_one_at_a_time_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let step = |name: &'static str, log: &Arc<Mutex<Vec<String>>>| {
        let log = Arc::clone(log);
        move |_: ()| {
            let log = Arc::clone(&log);
            Effect::<(), String>::command(
                name,
                move || async move {
                    log.lock().unwrap().push(format!("start {}", name));
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    log.lock().unwrap().push(format!("end {}", name));
                    Ok::<_, String>(())
                },
                Effect::success,
            )
        }
    };

    let flow = pipeline![step("a", &log), step("b", &log), step("c", &log)];
    assert_eq!(run_effect(flow.run(())).await, Ok(()));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["start a", "end a", "start b", "end b", "start c", "end c"]
    );
}

#[tokio::test]
async fn test_deep_command_chain_does_not_grow_the_stack() {
    fn count_down(n: u32) -> Effect<u32, String> {
        if n == 0 {
            return Effect::success(0);
        }
        Effect::command(
            "step",
            move || async move { Ok::<_, String>(n - 1) },
            count_down,
        )
    }

    let (result, trace) = Interpreter::new().run_traced(count_down(50_000)).await;
    assert_eq!(result, Ok(0));
    assert_eq!(trace.len(), 50_000);
}

#[tokio::test]
async fn test_many_steps_chained_onto_one_command_run_in_constant_stack() {
    let counter = CallCounter::new();
    let mut effect = read("seed", 0, &counter);
    for _ in 0..100_000 {
        effect = effect.and_then(|n| Effect::success(n + 1));
    }

    let (result, trace) = Interpreter::new().run_traced(effect).await;
    assert_eq!(result, Ok(100_000));
    assert_eq!(trace.len(), 1);
    assert_eq!(counter.count(), 1);
}

#[tokio::test]
async fn test_long_pipeline_behind_a_command_runs_in_constant_stack() {
    let counter = CallCounter::new();
    let seed_counter = counter.clone();
    let mut flow = Pipeline::new().then(move |_: ()| read("seed", 1, &seed_counter));
    for _ in 0..100_000 {
        flow = flow.then(|n: i32| Effect::success(n + 1));
    }

    let effect = flow.run(());
    assert_eq!(counter.count(), 0);
    assert_eq!(run_effect(effect).await, Ok(100_001));
    assert_eq!(counter.count(), 1);
}

#[tokio::test]
async fn test_operation_fault_passes_through_long_queue_to_map_err() {
    let later = CallCounter::new();
    let mut effect = Effect::<i32, String>::command(
        "refuse",
        || async { Err::<i32, _>("refused".to_string()) },
        Effect::success,
    );
    for _ in 0..100_000 {
        effect = effect.and_then(later.track(|n: i32| Effect::success(n + 1)));
    }
    let effect = effect.map_err(|e| format!("wrapped: {}", e));

    let (result, trace) = Interpreter::new().run_traced(effect).await;
    assert_eq!(result, Err("wrapped: refused".to_string()));
    assert_eq!(trace.fault().map(|fault| fault.phase), Some(Phase::Operation));
    assert_eq!(later.count(), 0);
}

#[tokio::test]
async fn test_map_err_converts_operation_fault() {
    #[derive(Debug, PartialEq)]
    enum AppError {
        Io(String),
    }

    let effect = Effect::<i32, String>::command(
        "load",
        || async { Err::<i32, _>("refused".to_string()) },
        Effect::success,
    )
    .map_err(AppError::Io);

    assert_eq!(run_effect(effect).await, Err(AppError::Io("refused".to_string())));
}

#[test]
fn test_blocking_runner_drives_sync_operations() {
    let counter = CallCounter::new();
    let hits = counter.clone();
    let effect = Effect::<usize, String>::command_sync(
        "read_config",
        move || {
            hits.hit();
            Ok::<_, String>("a=1\nb=2".to_string())
        },
        |raw: String| Effect::success(raw.lines().count()),
    );

    assert_eq!(run_effect_blocking(effect), Ok(2));
    assert_eq!(counter.count(), 1);
}

#[test]
fn test_blocking_runner_returns_outcomes_directly() {
    let interpreter = Interpreter::default();
    assert_eq!(interpreter.run_blocking(Effect::<_, String>::success(5)), Ok(5));
    assert_eq!(
        interpreter.run_blocking(Effect::<i32, _>::failure("no".to_string())),
        Err("no".to_string())
    );
}

#[tokio::test]
async fn test_effects_can_be_driven_on_spawned_tasks() {
    let counter = CallCounter::new();
    let effect = read("spawned", 9, &counter).map(|n| n * 2);

    let handle = tokio::spawn(async move { run_effect(effect).await });
    assert_eq!(handle.await.unwrap(), Ok(18));
    assert_eq!(counter.count(), 1);
}
