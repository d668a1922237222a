/// Unit tests for IncantError and IncantResult types

use ferrous_incant::{CallableKind, IncantError, IncantResult, ScopeKind};
use std::error::Error;

#[test]
fn test_error_display_circular() {
    let path = vec!["target".to_string(), "a".to_string(), "b".to_string(), "a".to_string()];
    let error = IncantError::Circular(path);
    let display_str = format!("{}", error);
    assert_eq!(display_str, "Circular dependency: target -> a -> b -> a");
    assert!(error.is_construction());
}

#[test]
fn test_error_display_depth_exceeded() {
    let error = IncantError::DepthExceeded(100);
    let display_str = format!("{}", error);
    assert_eq!(display_str, "Max depth 100 exceeded");

    assert!(display_str.contains("100"));
    assert!(display_str.contains("exceeded"));
}

#[test]
fn test_error_display_async_in_sync() {
    let error = IncantError::AsyncInSync {
        target: "handler".to_string(),
        node: "fetch".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "`fetch` is async and cannot run inside a synchronous composition of `handler`"
    );
}

#[test]
fn test_error_display_scope_kind_mismatch() {
    let error = IncantError::ScopeKindMismatch {
        factory: "conn".to_string(),
        declared: ScopeKind::Async,
        actual: CallableKind::ScopedResource,
    };
    assert_eq!(
        error.to_string(),
        "factory `conn` is declared as a async scoped resource but is a scoped resource"
    );
}

#[test]
fn test_error_display_type_conflict() {
    let error = IncantError::TypeConflict {
        name: "input".to_string(),
        first: "i64",
        second: "alloc::string::String",
    };
    assert_eq!(
        error.to_string(),
        "conflicting types for parameter `input`: i64 and alloc::string::String"
    );
}

#[test]
fn test_error_display_call_errors() {
    assert_eq!(
        IncantError::MissingArgument("x".to_string()).to_string(),
        "missing required argument `x`"
    );
    assert_eq!(
        IncantError::UnexpectedArgument("y".to_string()).to_string(),
        "unexpected keyword argument `y`"
    );
    assert_eq!(
        IncantError::TooManyPositional { expected: 1, given: 3 }.to_string(),
        "takes 1 positional argument(s) but 3 were given"
    );
    assert_eq!(
        IncantError::MultipleValues("z".to_string()).to_string(),
        "multiple values for argument `z`"
    );
    assert!(!IncantError::MissingArgument("x".to_string()).is_construction());
}

#[test]
fn test_factory_error_is_transparent() {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    let error = IncantError::factory(io);
    assert_eq!(error.to_string(), "refused");

    let inner = error.factory_error().unwrap();
    let io = inner.downcast_ref::<std::io::Error>().unwrap();
    assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
}

#[test]
fn test_release_error_display() {
    let error = IncantError::Release(vec![
        IncantError::factory("first"),
        IncantError::factory("second"),
    ]);
    assert_eq!(
        error.to_string(),
        "2 scoped resource(s) failed to release: first; second"
    );
    assert_eq!(error.release_errors().len(), 2);
    assert!(error.factory_error().is_none());
}

#[test]
fn test_unwind_error_keeps_source() {
    let error = IncantError::Unwind {
        error: Box::new(IncantError::factory("body failed")),
        release: vec![IncantError::factory("close failed")],
    };
    assert_eq!(
        error.to_string(),
        "body failed (while unwinding, 1 scoped resource(s) failed to release)"
    );
    assert_eq!(error.source().unwrap().to_string(), "body failed");
    assert_eq!(error.factory_error().unwrap().to_string(), "body failed");
}

#[test]
fn test_cancelled_display() {
    assert_eq!(IncantError::Cancelled.to_string(), "Operation was cancelled");
    assert!(IncantError::Cancelled.release_errors().is_empty());
}

#[test]
fn test_result_alias() {
    fn parse(ok: bool) -> IncantResult<u8> {
        if ok {
            Ok(1)
        } else {
            Err(IncantError::NotSync("f".to_string()))
        }
    }
    assert_eq!(parse(true).unwrap(), 1);
    assert_eq!(
        parse(false).unwrap_err().to_string(),
        "`f` is async; invoke it with `acall` or `call_async`"
    );
}
