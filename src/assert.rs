//! Assertions usable in tests and hooks.
//!
//! A failed assertion aborts the current phase by unwinding with an
//! [`AssertionFailure`] payload; the engine catches it and records its message.

use std::fmt;
use std::panic::resume_unwind;

/// Payload of a failed assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    pub file: &'static str,
    pub line: u32,
    pub message: String,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}

/// Abort the current phase with a failure message.
#[doc(hidden)]
pub fn failed_assertion(file: &'static str, line: u32, message: String) -> ! {
    resume_unwind(Box::new(AssertionFailure {
        file,
        line,
        message,
    }))
}

#[doc(hidden)]
pub fn describe_errno(errno: i32) -> String {
    std::io::Error::from_raw_os_error(errno).to_string()
}

/// Fail unconditionally with a formatted message.
#[macro_export]
macro_rules! assertion_failed {
    ($($arg:tt)+) => {
        $crate::assert::failed_assertion(file!(), line!(), format!($($arg)+))
    };
}

#[macro_export]
macro_rules! assert_true {
    ($actual:expr) => {
        if !($actual) {
            $crate::assertion_failed!("Expected true but got <{}>", stringify!($actual));
        }
    };
}

#[macro_export]
macro_rules! assert_false {
    ($actual:expr) => {
        if $actual {
            $crate::assertion_failed!("Expected false but got <{}>", stringify!($actual));
        }
    };
}

/// Compare with `==`, reporting the expressions only.
#[macro_export]
macro_rules! assert_equals {
    ($expected:expr, $actual:expr) => {
        if !($expected == $actual) {
            $crate::assertion_failed!(
                "Expected <{}> but got <{}>",
                stringify!($expected),
                stringify!($actual)
            );
        }
    };
}

#[macro_export]
macro_rules! assert_int_equals {
    ($expected:expr, $actual:expr) => {{
        let expected = ($expected) as i64;
        let actual = ($actual) as i64;
        if expected != actual {
            $crate::assertion_failed!(
                "Expected <{}> but got <{}> ({} != {})",
                expected,
                actual,
                stringify!($expected),
                stringify!($actual)
            );
        }
    }};
}

#[macro_export]
macro_rules! assert_double_equals {
    ($expected:expr, $actual:expr, $epsilon:expr) => {{
        let expected: f64 = $expected;
        let actual: f64 = $actual;
        let epsilon: f64 = $epsilon;
        if (expected - actual).abs() > epsilon {
            $crate::assertion_failed!(
                "Expected <{}+-{}> but got <{}> ({} != {})",
                expected,
                epsilon,
                actual,
                stringify!($expected),
                stringify!($actual)
            );
        }
    }};
}

#[macro_export]
macro_rules! assert_str_equals {
    ($expected:expr, $actual:expr) => {
        match (&$expected, &$actual) {
            (expected, actual) => {
                let expected: &str = ::std::convert::AsRef::as_ref(expected);
                let actual: &str = ::std::convert::AsRef::as_ref(actual);
                if expected != actual {
                    $crate::assertion_failed!(
                        "Expected <{}> but got <{}> ({} != {})",
                        expected,
                        actual,
                        stringify!($expected),
                        stringify!($actual)
                    );
                }
            }
        }
    };
}

/// Assert that an [`Option`] is `None`.
#[macro_export]
macro_rules! assert_null {
    ($value:expr) => {
        if let ::std::option::Option::Some(value) = &$value {
            $crate::assertion_failed!(
                "Expected <{}> to be None, instead it holds {:?}",
                stringify!($value),
                value
            );
        }
    };
}

/// Assert that an [`Option`] is `Some`.
#[macro_export]
macro_rules! assert_not_null {
    ($value:expr) => {
        if ($value).is_none() {
            $crate::assertion_failed!("<{}> ought not to be None", stringify!($value));
        }
    };
}

/// Compare two OS error numbers.
#[macro_export]
macro_rules! assert_errno_val {
    ($expected:expr, $actual:expr) => {{
        let expected: i32 = $expected;
        let actual: i32 = $actual;
        if expected != actual {
            $crate::assertion_failed!(
                "Expected error {} ({}, {}) but got error {} ({})",
                expected,
                stringify!($expected),
                $crate::assert::describe_errno(expected),
                actual,
                $crate::assert::describe_errno(actual)
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    use std::panic::catch_unwind;

    use super::AssertionFailure;

    fn failure(f: impl FnOnce() + std::panic::UnwindSafe) -> AssertionFailure {
        let payload = catch_unwind(f).unwrap_err();
        payload.downcast::<AssertionFailure>().map(|b| *b).unwrap()
    }

    #[test]
    fn true_reports_expression() {
        let failure = failure(|| assert_true!(2 < 1));
        assert_eq!(failure.message, "Expected true but got <2 < 1>");
        assert_eq!(failure.file, file!());
    }

    #[test]
    fn int_equals_reports_values() {
        let failure = failure(|| assert_int_equals!(3, 1 + 1));
        assert_eq!(failure.message, "Expected <3> but got <2> (3 != 1 + 1)");
    }

    #[test]
    fn str_equals_accepts_owned_strings() {
        let owned = String::from("abc");
        assert_str_equals!("abc", owned);
        let failure = failure(move || assert_str_equals!("abd", owned));
        assert_eq!(failure.message, "Expected <abd> but got <abc> (\"abd\" != owned)");
    }

    #[test]
    fn null_checks_use_options() {
        let none: Option<u8> = None;
        assert_null!(none);
        assert_not_null!(Some(1));
        let failure = failure(|| assert_null!(Some(7)));
        assert_eq!(failure.message, "Expected <Some(7)> to be None, instead it holds 7");
    }

    #[test]
    fn display_prefixes_location() {
        let failure = AssertionFailure {
            file: "a.rs",
            line: 4,
            message: "boom".into(),
        };
        assert_eq!(failure.to_string(), "a.rs:4: boom");
    }
}
