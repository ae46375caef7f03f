/// Declares a newtype identity and implements [`IdentityType`](crate::model::IdentityType) for it.
///
/// ```
/// aggmirror::identity_type!(pub struct CustomerId(i64););
///
/// use aggmirror::model::IdentityType;
/// assert_eq!(CustomerId(3).to_identity().to_string(), "CustomerId(3)");
/// ```
#[macro_export]
macro_rules! identity_type {
    ($(#[$meta:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        $vis struct $name(pub $inner);

        impl $crate::model::IdentityType for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn from_identity(identity: &$crate::model::Identity) -> $crate::core::Result<Self> {
                <$inner as $crate::model::IdentityValue>::from_value(identity.value())
                    .map($name)
                    .ok_or_else(|| {
                        $crate::core::PersistenceError::Mapping(format!(
                            "Cannot construct {} from {}",
                            stringify!($name),
                            identity.value()
                        ))
                    })
            }

            fn to_identity(&self) -> $crate::model::Identity {
                $crate::model::Identity::new(
                    stringify!($name),
                    $crate::model::IdentityValue::into_value(self.0.clone()),
                )
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}
