//! Macros for declaring state and event identifiers.

/// Generate a `State` implementation for a fieldless enum.
///
/// Variant names double as state names.
///
/// # Example
///
/// ```
/// use hsmcore::core::State;
/// use hsmcore::state_enum;
///
/// state_enum! {
///     pub enum Door {
///         Closed,
///         Open,
///     }
/// }
///
/// assert_eq!(Door::Open.name(), "Open");
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}

/// Generate an `Event` implementation for a fieldless enum.
///
/// # Example
///
/// ```
/// use hsmcore::core::Event;
/// use hsmcore::event_enum;
///
/// event_enum! {
///     enum DoorEvent {
///         Push,
///         Pull,
///     }
/// }
///
/// assert_eq!(DoorEvent::Pull.name(), "Pull");
/// ```
#[macro_export]
macro_rules! event_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::Event for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}

/// Build an argument vector from values convertible into `Variant`.
///
/// # Example
///
/// ```
/// use hsmcore::args;
/// use hsmcore::core::Variant;
///
/// let args = args![42, "left", true];
/// assert_eq!(args.len(), 3);
/// assert_eq!(args[1], Variant::from("left"));
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::core::Args::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::core::Variant::from($value)),+]
    };
}
