/// Rule precedence tests
///
/// Later registrations shadow earlier ones, regardless of how the rule
/// matches (by name, by type, or by an arbitrary predicate).

use ferrous_incant::{
    type_key, value, CallArgs, Callable, IncantError, Incanter, Param, ScopeKind, Signature,
    Supply, ValueExt,
};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Settings {
    env: &'static str,
}

fn target_a() -> Callable {
    Callable::from_fn1("target", "a", |a: i64| a)
}

#[test]
fn test_later_rule_wins() {
    let mut incanter = Incanter::new();
    incanter.register_by_name("a", Supply::value(1i64));
    incanter.register_by_name("a", Supply::value(2i64));
    incanter.register_by_name("a", Supply::value(3i64));

    let out = incanter.call(&target_a(), CallArgs::new()).unwrap();
    assert_eq!(out.get::<i64>().unwrap(), 3);
}

#[test]
fn test_type_rule_shadows_earlier_name_rule() {
    let mut incanter = Incanter::new();
    incanter.register_by_name("a", Supply::value(1i64));
    incanter.register_by_type::<i64>(Supply::value(2i64));

    let out = incanter.call(&target_a(), CallArgs::new()).unwrap();
    assert_eq!(out.get::<i64>().unwrap(), 2);
}

#[test]
fn test_name_rule_shadows_earlier_type_rule() {
    let mut incanter = Incanter::new();
    incanter.register_by_type::<i64>(Supply::value(2i64));
    incanter.register_by_name("a", Supply::value(1i64));

    let out = incanter.call(&target_a(), CallArgs::new()).unwrap();
    assert_eq!(out.get::<i64>().unwrap(), 1);
}

#[test]
fn test_non_matching_later_rule_does_not_shadow() {
    let mut incanter = Incanter::new();
    incanter.register_by_name("a", Supply::value(1i64));
    incanter.register_by_name("b", Supply::value(2i64));

    let out = incanter.call(&target_a(), CallArgs::new()).unwrap();
    assert_eq!(out.get::<i64>().unwrap(), 1);
}

#[test]
fn test_register_by_type_matches_declared_type_only() {
    let mut incanter = Incanter::new();
    incanter.register_value(Settings { env: "prod" });

    let typed = Callable::from_fn1("typed", "cfg", |cfg: Settings| cfg.env);
    let out = incanter.call(&typed, CallArgs::new()).unwrap();
    assert_eq!(out.get::<&'static str>().unwrap(), "prod");

    // An untyped parameter is never matched by a type rule.
    let untyped = Callable::sync("untyped", Signature::new().param(Param::new("cfg")), |_| {
        Ok(value(()))
    });
    assert!(incanter.compose(&untyped).unwrap().ptr_eq(&untyped));
}

#[test]
fn test_register_by_return_type() {
    let mut incanter = Incanter::new();
    let load = Callable::from_fn0("load_settings", || Settings { env: "staging" });
    incanter.register_by_return_type(&load).unwrap();

    let target = Callable::from_fn1("target", "settings", |s: Settings| s.env);
    let out = incanter.call(&target, CallArgs::new()).unwrap();
    assert_eq!(out.get::<&'static str>().unwrap(), "staging");
}

#[test]
fn test_register_by_return_type_without_type() {
    let mut incanter = Incanter::new();
    let untyped = Callable::sync("untyped", Signature::new(), |_| Ok(value(1u8)));
    let err = incanter.register_by_return_type(&untyped).err().unwrap();
    assert!(err.is_construction());
    assert_eq!(
        err.to_string(),
        "`untyped` declares no return type; provide a type explicitly"
    );
}

#[test]
fn test_register_by_own_name() {
    let mut incanter = Incanter::new();
    let db_url = Callable::from_fn0("db_url", || "postgres://localhost".to_string());
    incanter.register_by_own_name(&db_url);

    let target = Callable::from_fn1("target", "db_url", |url: String| url.len());
    let out = incanter.call(&target, CallArgs::new()).unwrap();
    assert_eq!(out.get::<usize>().unwrap(), "postgres://localhost".len());
}

#[test]
fn test_factory_generator_sees_parameter() {
    let mut incanter = Incanter::new();
    // Every `*_port` parameter gets a port derived from its name.
    incanter.register(
        |p| p.name().ends_with("_port"),
        |p| {
            let port: u16 = if p.name().starts_with("http") { 80 } else { 5432 };
            Callable::constant(p.name().to_string(), port)
        },
        ScopeKind::None,
    );

    let target = Callable::from_fn2("target", ["http_port", "db_port"], |h: u16, d: u16| (h, d));
    let out = incanter.call(&target, CallArgs::new()).unwrap();
    assert_eq!(out.get::<(u16, u16)>().unwrap(), (80, 5432));
}

#[test]
fn test_predicate_on_default_presence() {
    let mut incanter = Incanter::new();
    incanter.register_hook(
        |p| p.has_default() && p.declared_type() == Some(type_key::<u32>()),
        Callable::from_fn0("override", || 99u32),
        ScopeKind::None,
    );

    let target = Callable::sync(
        "target",
        Signature::new()
            .param(Param::new("retries").typed::<u32>().default_value(3u32))
            .param(Param::new("count").typed::<u32>()),
        |args| Ok(value(args.get::<u32>("retries")? + args.get::<u32>("count")?)),
    );

    let composed = incanter.compose(&target).unwrap();
    assert_eq!(composed.signature().params()[0].name(), "count");
    let out = composed.call(CallArgs::new().arg(1u32)).unwrap();
    assert_eq!(out.get::<u32>().unwrap(), 100);
}

#[test]
fn test_registry_is_not_mutated_by_composition() {
    let mut incanter = Incanter::new();
    incanter.register_value(1i64);
    let rules = incanter.rule_count();
    let snapshot = incanter.snapshot();

    incanter.compose(&target_a()).unwrap();
    assert_eq!(incanter.rule_count(), rules);
    assert_eq!(incanter.snapshot(), snapshot);
}

#[test]
fn test_clones_register_independently() {
    let mut base = Incanter::new();
    base.register_value(1i64);

    let mut derived = base.clone();
    derived.register_value(2i64);

    let target = target_a();
    assert_eq!(base.call(&target, CallArgs::new()).unwrap().get::<i64>().unwrap(), 1);
    assert_eq!(derived.call(&target, CallArgs::new()).unwrap().get::<i64>().unwrap(), 2);
}

#[test]
fn test_unmatched_parameter_is_required() {
    let incanter = Incanter::new();
    let err = incanter.call(&target_a(), CallArgs::new()).unwrap_err();
    assert!(matches!(err, IncantError::MissingArgument(ref name) if name == "a"));
}

// Property: the most recent matching registration always wins
proptest! {
    #[test]
    fn latest_registration_wins(values in prop::collection::vec(any::<i64>(), 1..20)) {
        let mut incanter = Incanter::new();
        for v in &values {
            incanter.register_by_name("a", Supply::value(*v));
        }

        let out = incanter.call(&target_a(), CallArgs::new()).unwrap();
        prop_assert_eq!(out.get::<i64>().unwrap(), *values.last().unwrap());
    }
}

// Property: rules for other names never affect the result
proptest! {
    #[test]
    fn unrelated_rules_are_ignored(
        expected in any::<i64>(),
        noise in prop::collection::vec("[b-z][a-z]{0,8}", 0..10),
    ) {
        let mut incanter = Incanter::new();
        incanter.register_by_name("a", Supply::value(expected));
        for name in &noise {
            incanter.register_by_name(name.clone(), Supply::value(0i64));
        }

        let out = incanter.call(&target_a(), CallArgs::new()).unwrap();
        prop_assert_eq!(out.get::<i64>().unwrap(), expected);
    }
}
