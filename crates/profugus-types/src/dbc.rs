// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Design-by-Contract
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Precondition / postcondition / invariant assertions.
//!
//! A failed contract is a tracking or programming bug, never bad input, so
//! every macro here panics with a diagnostic and nothing catches it:
//!
//! - [`require!`]: precondition, always checked
//! - [`ensure!`]: postcondition, always checked
//! - [`check!`]: internal invariant, checked in debug builds only
//! - [`insist!`]: always checked, with a caller-supplied message

/// Abort with the standard contract diagnostic.
#[cold]
#[inline(never)]
pub fn contract_violation(condition: &str, file: &str, line: u32) -> ! {
    panic!("Assertion: {condition}, failed in {file}:{line}")
}

/// Abort with the standard contract diagnostic plus a message.
#[cold]
#[inline(never)]
pub fn contract_violation_msg(condition: &str, message: &str, file: &str, line: u32) -> ! {
    panic!("Assertion: {condition}, failed in {file}:{line}: {message}")
}

#[macro_export]
macro_rules! require {
    ($cond:expr $(,)?) => {
        if !$cond {
            $crate::dbc::contract_violation(stringify!($cond), file!(), line!());
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::dbc::contract_violation_msg(
                stringify!($cond),
                &format!($($arg)+),
                file!(),
                line!(),
            );
        }
    };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr $(,)?) => {
        if !$cond {
            $crate::dbc::contract_violation(stringify!($cond), file!(), line!());
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::dbc::contract_violation_msg(
                stringify!($cond),
                &format!($($arg)+),
                file!(),
                line!(),
            );
        }
    };
}

#[macro_export]
macro_rules! check {
    ($cond:expr $(,)?) => {
        if cfg!(debug_assertions) && !$cond {
            $crate::dbc::contract_violation(stringify!($cond), file!(), line!());
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if cfg!(debug_assertions) && !$cond {
            $crate::dbc::contract_violation_msg(
                stringify!($cond),
                &format!($($arg)+),
                file!(),
                line!(),
            );
        }
    };
}

#[macro_export]
macro_rules! insist {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::dbc::contract_violation_msg(
                stringify!($cond),
                &format!($($arg)+),
                file!(),
                line!(),
            );
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_passing_contracts_are_silent() {
        let n = 3;
        require!(n > 0);
        ensure!(n == 3, "n should be three, got {n}");
        check!(n < 10);
        insist!(n != 0, "n must be nonzero");
    }

    #[test]
    #[should_panic(expected = "Assertion: n > 5")]
    fn test_require_panics_with_diagnostic() {
        let n = 3;
        require!(n > 5);
    }

    #[test]
    #[should_panic(expected = "denominator is zero")]
    fn test_insist_carries_message() {
        let d = 0.0_f64;
        insist!(d > 0.0, "denominator is zero");
    }
}
