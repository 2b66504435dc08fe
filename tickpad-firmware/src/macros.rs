#[allow(unused)]
#[cfg(all(not(test), not(feature = "defmt"), not(feature = "test-utils")))]
mod silent {
    #[macro_export]
    macro_rules! debug {
        ($($arg:expr),*) => {{let _ = ($($arg),*);}};
    }

    #[macro_export]
    macro_rules! info {
        ($($arg:expr),*) => {{let _ = ($($arg),*);}};
    }

    #[macro_export]
    macro_rules! warn {
        ($($arg:expr),*) => {{let _ = ($($arg),*);}};
    }

    #[macro_export]
    macro_rules! error {
        ($($arg:expr),*) => {{let _ = ($($arg),*);}};
    }
}

#[cfg(all(not(test), not(feature = "test-utils"), feature = "defmt"))]
mod defmt {
    /// Log debug messages. It will call the [defmt::debug] macro.
    ///
    /// The macro works with defmt, with `eprintln!` when running on the host for tests, or compiles
    /// to nothing. To work with both `defmt` and `eprintln!` only the `{}` and `{:?}` placeholders
    /// can be used and every argument must implement both `Debug` and `defmt::Format`.
    ///
    /// # Example
    ///
    /// ```rust
    /// # #[macro_use] extern crate tickpad_firmware;
    /// # fn main() {
    /// let row = 2;
    /// let label = ":w<Enter>";
    /// debug!("macro at row {}: {:?}", row, label);
    /// # }
    /// ```
    #[macro_export]
    macro_rules! debug {
        ($($arg:expr),*) => {
            defmt::debug!($($arg,)*)
        };
    }

    #[macro_export]
    macro_rules! info {
        ($($arg:expr),*) => {
            defmt::info!($($arg,)*)
        };
    }

    #[macro_export]
    macro_rules! warn {
        ($($arg:expr),*) => {
            defmt::warn!($($arg,)*)
        };
    }

    #[macro_export]
    macro_rules! error {
        ($($arg:expr),*) => {
            defmt::error!($($arg,)*)
        };
    }
}

#[cfg(any(test, feature = "test-utils"))]
mod host {
    #[macro_export]
    macro_rules! debug {
        ($($arg:expr),*) => {{
            extern crate std;
            std::eprintln!("DEBUG: {}", format_args!($($arg,)*))
        }};
    }

    #[macro_export]
    macro_rules! info {
        ($($arg:expr),*) => {{
            extern crate std;
            std::eprintln!("INFO: {}", format_args!($($arg,)*))
        }};
    }

    #[macro_export]
    macro_rules! warn {
        ($($arg:expr),*) => {{
            extern crate std;
            std::eprintln!("WARN: {}", format_args!($($arg,)*))
        }};
    }

    /// Errors are bugs when testing so fail the test.
    #[macro_export]
    macro_rules! error {
        ($($arg:expr),*) => {{
            extern crate std;
            if cfg!(test) {
                panic!("{}", format_args!($($arg,)*));
            } else {
                std::eprintln!("\nERROR: at ./{}:{}:{}:\n{}", file!(), line!(), column!(), format_args!($($arg,)*));
            }
        }};
    }
}
