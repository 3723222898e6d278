//! Property tests for chain and pipeline laws.

use proptest::prelude::*;
use undertow::prelude::*;
use undertow::testing::CallCounter;

fn outcome() -> impl Strategy<Value = Result<i32, String>> {
    prop_oneof![
        any::<i32>().prop_map(Ok::<i32, String>),
        "[a-z]{1,8}".prop_map(Err::<i32, String>),
    ]
}

fn f(x: i32) -> Effect<i64, String> {
    if x % 3 == 0 {
        Effect::failure(format!("{} divisible by 3", x))
    } else {
        Effect::success(i64::from(x) * 2)
    }
}

fn g(y: i64) -> Effect<String, String> {
    if y < 0 {
        Effect::failure("negative".to_string())
    } else {
        Effect::success(y.to_string())
    }
}

fn pending(result: i32) -> Effect<i32, String> {
    Effect::command("pending", move || async move { Ok::<_, String>(result) }, Effect::success)
}

proptest! {
    #[test]
    fn chain_is_associative_for_outcomes(start in outcome()) {
        let left = chain(chain(Effect::from(start.clone()), f), g);
        let right = chain(Effect::from(start), |x| chain(f(x), g));
        prop_assert_eq!(left, right);
    }

    #[test]
    fn chain_is_associative_for_commands(resumed in any::<i32>()) {
        let left = chain(chain(pending(0), f), g);
        let right = chain(pending(0), |x| chain(f(x), g));
        prop_assert_eq!(left.label(), right.label());
        prop_assert_eq!(left.resume(resumed), right.resume(resumed));
    }

    #[test]
    fn success_threads_values_between_steps(start in -1000i32..1000) {
        let flow = pipeline![
            |x: i32| Effect::<_, String>::success(x + 1),
            |x: i32| Effect::<_, String>::success(x * 3),
            |x: i32| Effect::<_, String>::success(x - 7)
        ];
        prop_assert_eq!(flow.run(start), Effect::success((start + 1) * 3 - 7));
    }

    #[test]
    fn first_failure_short_circuits(start in any::<i32>(), message in "[a-z]{1,12}") {
        let later = CallCounter::new();
        let fail = move |_: i32| Effect::<i32, String>::failure(message.clone());
        let spy = later.track(|x: i32| Effect::<i32, String>::success(x));

        let flow = pipeline![fail.clone(), spy.clone(), spy];
        let expected = fail(start);
        prop_assert_eq!(flow.run(start), expected);
        prop_assert_eq!(later.count(), 0);
    }

    #[test]
    fn building_never_invokes_operations(values in prop::collection::vec(any::<i32>(), 1..20)) {
        let operations = CallCounter::new();
        let mut effect = Effect::<i32, String>::success(0);
        for value in values {
            let operations = operations.clone();
            effect = effect.and_then(move |acc| {
                Effect::command(
                    "add",
                    move || {
                        operations.hit();
                        async move { Ok::<_, String>(value) }
                    },
                    move |v: i32| Effect::success(acc.wrapping_add(v)),
                )
            });
        }
        prop_assert!(effect.is_command());
        prop_assert_eq!(operations.count(), 0);
    }
}

#[test]
fn operations_run_only_when_interpreted() {
    let operations = CallCounter::new();
    let build = |value: i32| {
        let operations = operations.clone();
        move |acc: i32| {
            let operations = operations.clone();
            Effect::<i32, String>::command(
                "add",
                move || {
                    operations.hit();
                    async move { Ok::<_, String>(value) }
                },
                move |v: i32| Effect::success(acc + v),
            )
        }
    };

    let flow = pipeline![build(1), build(2), build(3)];
    let effect = flow.run(0);
    assert_eq!(operations.count(), 0);

    assert_eq!(run_effect_blocking(effect), Ok(6));
    assert_eq!(operations.count(), 3);
}
