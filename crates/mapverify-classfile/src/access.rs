//! JVM access flag bits (JVMS §4.1, §4.5, §4.6).

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_BRIDGE: u16 = 0x0040;
pub const ACC_VARARGS: u16 = 0x0080;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;

/// Declared visibility of a class or member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    Public,
    Protected,
    Package,
    Private,
}

impl Visibility {
    pub fn from_flags(flags: u16) -> Self {
        if flags & ACC_PUBLIC != 0 {
            Visibility::Public
        } else if flags & ACC_PROTECTED != 0 {
            Visibility::Protected
        } else if flags & ACC_PRIVATE != 0 {
            Visibility::Private
        } else {
            Visibility::Package
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_prefers_the_widest_flag() {
        assert_eq!(Visibility::from_flags(ACC_PUBLIC | ACC_STATIC), Visibility::Public);
        assert_eq!(Visibility::from_flags(ACC_PROTECTED), Visibility::Protected);
        assert_eq!(Visibility::from_flags(ACC_PRIVATE | ACC_FINAL), Visibility::Private);
        assert_eq!(Visibility::from_flags(ACC_FINAL), Visibility::Package);
    }
}
