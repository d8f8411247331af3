//! Logging shim.
//!
//! Forwards to `defmt` on hardware builds and to `tracing` on host builds.
//! With neither available the arguments are still evaluated by reference so
//! call sites compile the same way everywhere.
//!
//! Format strings must stay within the common subset of both crates: plain
//! `{}` placeholders over integers, `&str` and types implementing both
//! `Display` and `defmt::Format`.

#![macro_use]
#![allow(unused_macros)]

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::trace!($s $(, $x)*);
            #[cfg(all(any(test, feature = "std"), not(feature = "defmt")))]
            ::tracing::trace!($s $(, $x)*);
            #[cfg(not(any(test, feature = "std", feature = "defmt")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::debug!($s $(, $x)*);
            #[cfg(all(any(test, feature = "std"), not(feature = "defmt")))]
            ::tracing::debug!($s $(, $x)*);
            #[cfg(not(any(test, feature = "std", feature = "defmt")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::info!($s $(, $x)*);
            #[cfg(all(any(test, feature = "std"), not(feature = "defmt")))]
            ::tracing::info!($s $(, $x)*);
            #[cfg(not(any(test, feature = "std", feature = "defmt")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::warn!($s $(, $x)*);
            #[cfg(all(any(test, feature = "std"), not(feature = "defmt")))]
            ::tracing::warn!($s $(, $x)*);
            #[cfg(not(any(test, feature = "std", feature = "defmt")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::error!($s $(, $x)*);
            #[cfg(all(any(test, feature = "std"), not(feature = "defmt")))]
            ::tracing::error!($s $(, $x)*);
            #[cfg(not(any(test, feature = "std", feature = "defmt")))]
            let _ = ($( & $x ),*);
        }
    };
}
