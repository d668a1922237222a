use ferrous_incant::{
    value, Available, Callable, IncantError, Incanter, Param, Shape, Signature, ValueExt,
};

fn sum_ac() -> Callable {
    Callable::from_fn2("handler", ["a", "c"], |a: i64, c: i64| a * 10 + c)
}

#[test]
fn test_unused_values_are_dropped() {
    let incanter = Incanter::new();
    let available = Available::new()
        .with("a", 1i64)
        .with("b", 2i64)
        .with("c", 3i64);

    let out = incanter.incant(&sum_ac(), available).unwrap();
    assert_eq!(out.get::<i64>().unwrap(), 13);
}

#[test]
fn test_positional_matched_by_type() {
    let incanter = Incanter::new();
    let handler = Callable::from_fn2("handler", ["name", "age"], |name: String, age: u8| {
        format!("{} is {}", name, age)
    });

    let available = Available::new()
        .positional(30u8)
        .positional("grace".to_string());
    let out = incanter.incant(&handler, available).unwrap();
    assert_eq!(out.get::<String>().unwrap(), "grace is 30");
}

#[test]
fn test_name_takes_precedence_over_type() {
    let incanter = Incanter::new();
    let available = Available::new().positional(100i64).with("a", 1i64);

    let out = incanter.incant(&sum_ac(), available).unwrap();
    // `a` by name, `c` by type.
    assert_eq!(out.get::<i64>().unwrap(), 110);
}

#[test]
fn test_default_used_when_nothing_matches() {
    let incanter = Incanter::new();
    let handler = Callable::sync(
        "handler",
        Signature::new()
            .param(Param::new("user").typed::<String>())
            .param(Param::new("verbose").typed::<bool>().keyword_only().default_value(false)),
        |args| {
            let user = args.get::<String>("user")?;
            Ok(value(if args.get::<bool>("verbose")? {
                format!("user={}", user)
            } else {
                user
            }))
        },
    );

    let quiet = incanter
        .incant(&handler, Available::new().with("user", "ada".to_string()))
        .unwrap();
    assert_eq!(quiet.get::<String>().unwrap(), "ada");

    let loud = incanter
        .incant(
            &handler,
            Available::new().with("user", "ada".to_string()).with("verbose", true),
        )
        .unwrap();
    assert_eq!(loud.get::<String>().unwrap(), "user=ada");
}

#[test]
fn test_missing_value_is_an_error() {
    let incanter = Incanter::new();
    let err = incanter
        .incant(&sum_ac(), Available::new().with("a", 1i64))
        .unwrap_err();
    assert!(matches!(err, IncantError::MissingArgument(ref name) if name == "c"));
}

#[test]
fn test_untyped_parameter_needs_a_name() {
    let incanter = Incanter::new();
    let handler = Callable::sync("handler", Signature::new().param(Param::new("x")), |_| {
        Ok(value(()))
    });
    let err = incanter
        .incant(&handler, Available::new().positional(1i64))
        .unwrap_err();
    assert!(matches!(err, IncantError::MissingArgument(ref name) if name == "x"));
}

#[test]
fn test_incant_does_not_consult_rules() {
    let mut incanter = Incanter::new();
    incanter.register_by_name("c", ferrous_incant::Supply::value(9i64));

    let err = incanter
        .incant(&sum_ac(), Available::new().with("a", 1i64))
        .unwrap_err();
    assert!(matches!(err, IncantError::MissingArgument(_)));
}

#[test]
fn test_later_named_value_replaces_earlier() {
    let incanter = Incanter::new();
    let available = Available::new()
        .with("a", 1i64)
        .with("c", 3i64)
        .with("a", 5i64);
    let out = incanter.incant(&sum_ac(), available).unwrap();
    assert_eq!(out.get::<i64>().unwrap(), 53);
}

#[test]
fn test_adapted_call_reused_across_values() {
    let incanter = Incanter::new();
    let handler = sum_ac();
    let shape = Shape::new().named("a").named("b").named("c");
    let adapted = incanter.adapt(&handler, &shape).unwrap();
    assert!(adapted.target().ptr_eq(&handler));

    for i in 0..5i64 {
        let out = adapted
            .call(Available::new().with("a", i).with("b", 0i64).with("c", i))
            .unwrap();
        assert_eq!(out.get::<i64>().unwrap(), i * 11);
    }
}

#[test]
fn test_adapt_rejects_unfillable_shape() {
    let incanter = Incanter::new();
    let err = incanter
        .adapt(&sum_ac(), &Shape::new().named("a"))
        .err()
        .unwrap();
    assert!(matches!(err, IncantError::MissingArgument(ref name) if name == "c"));
}

#[tokio::test]
async fn test_aincant_awaits_async_target() {
    let incanter = Incanter::new();
    let handler = Callable::async_fn(
        "handler",
        Signature::new().param(Param::new("id").typed::<u32>()),
        |args| async move {
            tokio::task::yield_now().await;
            Ok(value(args.get::<u32>("id")? + 1))
        },
    );

    let out = incanter
        .aincant(&handler, Available::new().with("id", 41u32).with("extra", "x"))
        .await
        .unwrap();
    assert_eq!(out.get::<u32>().unwrap(), 42);

    // A sync incant of an async target is refused.
    let err = incanter
        .incant(&handler, Available::new().with("id", 1u32))
        .unwrap_err();
    assert!(matches!(err, IncantError::NotSync(_)));
}

#[tokio::test]
async fn test_aincant_accepts_sync_target() {
    let incanter = Incanter::new();
    let out = incanter
        .aincant(&sum_ac(), Available::new().with("a", 2i64).with("c", 4i64))
        .await
        .unwrap();
    assert_eq!(out.get::<i64>().unwrap(), 24);
}
