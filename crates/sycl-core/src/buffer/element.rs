//! Element types a buffer can hold

use std::fmt;

/// Sealed trait pattern for element types
mod sealed {
    pub trait Sealed {}
}

/// Scalar type with a device-side counterpart in kernel source
pub trait Element: sealed::Sealed + bytemuck::Pod + fmt::Debug + Send + Sync + 'static {
    /// Type name used in generated kernel source
    const CL_TYPE: &'static str;
}

macro_rules! element {
    ($($ty:ty => $cl:literal),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}
        impl Element for $ty {
            const CL_TYPE: &'static str = $cl;
        }
    )*};
}

element! {
    i8 => "char",
    u8 => "uchar",
    i16 => "short",
    u16 => "ushort",
    i32 => "int",
    u32 => "uint",
    i64 => "long",
    u64 => "ulong",
    f32 => "float",
    f64 => "double",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_type_names() {
        assert_eq!(<f32 as Element>::CL_TYPE, "float");
        assert_eq!(<u8 as Element>::CL_TYPE, "uchar");
        assert_eq!(<i64 as Element>::CL_TYPE, "long");
    }
}
