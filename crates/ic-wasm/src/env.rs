//! Browser clock and entropy.

use ic_core::env::Env;

/// `Date.now()` and `Math.random()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsEnv;

impl Env for JsEnv {
    fn now_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }

    fn random_unit(&self) -> f64 {
        js_sys::Math::random()
    }
}
