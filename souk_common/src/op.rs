/// Implements the standard operator traits for single-field tuple newtypes, so that money types
/// don't have to unwrap to their inner integer for every bit of arithmetic.
///
/// Three forms are supported:
/// * `op!(binary Fils, Add, add)` implements `Add` for `Fils + Fils`.
/// * `op!(inplace Fils, SubAssign, sub_assign)` implements `SubAssign` for `Fils -= Fils`.
/// * `op!(unary Fils, Neg, neg)` implements `Neg` for `-Fils`.
#[macro_export]
macro_rules! op {
    (binary $ty:ident, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $ty {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0, rhs.0))
            }
        }
    };
    (inplace $ty:ident, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $ty {
            fn $method(&mut self, rhs: Self) {
                std::ops::$trait::$method(&mut self.0, rhs.0)
            }
        }
    };
    (unary $ty:ident, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $ty {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0))
            }
        }
    };
}
