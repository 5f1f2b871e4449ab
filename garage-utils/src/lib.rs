pub mod time_window;

/// Implement `From<T>` for a type which already implements `From<&T>`.
#[macro_export]
macro_rules! derive_from_reference {
    ($from_type:ty, $impl_type:ty) => {
        impl From<$from_type> for $impl_type {
            fn from(value: $from_type) -> Self {
                Self::from(&value)
            }
        }
    };
}

/// Implement `TryFrom<T>` for a type which already implements `TryFrom<&T>`.
#[macro_export]
macro_rules! derive_try_from_reference {
    ($from_type:ty, $impl_type:ty, $error_type:ty) => {
        impl TryFrom<$from_type> for $impl_type {
            type Error = $error_type;
            fn try_from(value: $from_type) -> Result<Self, Self::Error> {
                Self::try_from(&value)
            }
        }
    };
}
