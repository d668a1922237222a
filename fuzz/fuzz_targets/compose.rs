#![no_main]

use ferrous_incant::{value, CallArgs, Callable, IncantError, Incanter, Param, Signature, Supply};
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];

// Each input byte pair registers a factory for one name whose parameters are
// picked from a bitmask. Cycles, shadowing and forwarded parameters all
// arise naturally; composing must never panic.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let mut incanter = Incanter::new();
    for pair in data.chunks_exact(2).take(32) {
        let name = NAMES[(pair[0] % 8) as usize];
        let mask = pair[1];

        if mask == 0 {
            incanter.register_by_name(name, Supply::value(1u64));
            continue;
        }

        let signature = NAMES
            .iter()
            .enumerate()
            .filter(|(ix, _)| mask & (1 << ix) != 0)
            .fold(Signature::new(), |s, (_, p)| s.param(Param::new(*p)));
        let factory = Callable::sync(name, signature, |args| Ok(value(args.len() as u64)));
        incanter.register_by_name(name, factory);
    }

    let target = NAMES
        .iter()
        .fold(Signature::new(), |s, p| s.param(Param::new(*p)));
    let target = Callable::sync("target", target, |_| Ok(value(())));

    match incanter.compose(&target) {
        Ok(composed) => {
            // Composition is cached.
            let again = incanter.compose(&target).unwrap();
            assert!(composed.ptr_eq(&again));

            let args = composed
                .signature()
                .params()
                .iter()
                .fold(CallArgs::new(), |a, p| a.kwarg(p.name(), 0u64));
            assert!(composed.call(args).is_ok());
        }
        Err(IncantError::Circular(path)) => {
            assert!(path.len() >= 2);
            assert_eq!(path.first().map(String::as_str), Some("target"));
        }
        Err(IncantError::DepthExceeded(_)) => {}
        Err(other) => panic!("unexpected construction error: {}", other),
    }
});
