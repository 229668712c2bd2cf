use std::any::type_name;
use std::sync::Arc;

use crate::component::{downcast, Component, Instance};
use crate::error::{ContainerError, Result};

/// A Callable can be invoked with a list of resolved instances.
///
/// This trait is implemented for all functions with up to 10 arguments of type ```Arc<T>```,
/// using a tuple to wrap the parameter types in a single type. Each instance is downcast to the
/// expected parameter type before the call.
pub trait Callable<Args, Ret>: Send + Sync + 'static {
    /// Number of parameters of the function
    const ARITY: usize;

    fn call_with(&self, key: &str, args: &[Instance]) -> Result<Ret>;
}

fn argument<T: Component>(key: &str, args: &[Instance], position: usize) -> Result<Arc<T>> {
    let arg = args.get(position).ok_or_else(|| ContainerError::InvalidTarget {
        key: key.to_string(),
        reason: format!("missing argument at position {}", position),
    })?;
    downcast::<T>(arg).ok_or_else(|| ContainerError::TypeMismatch {
        key: key.to_string(),
        expected: type_name::<T>(),
    })
}

macro_rules! callable_tuple ({ $($param:ident)* } => {
    impl<Func, Ret, $($param,)*> Callable<($($param,)*), Ret> for Func
    where
        Func: Fn($(Arc<$param>),*) -> Ret + Send + Sync + 'static,
        $($param: Component,)*
    {
        const ARITY: usize = <[&str]>::len(&[$(stringify!($param)),*]);

        #[inline]
        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        fn call_with(&self, key: &str, args: &[Instance]) -> Result<Ret> {
            if args.len() != Self::ARITY {
                return Err(ContainerError::InvalidTarget {
                    key: key.to_string(),
                    reason: format!("expected {} argument(s), got {}", Self::ARITY, args.len()),
                });
            }
            let mut position = 0;
            $(
                let $param = argument::<$param>(key, args, position)?;
                position += 1;
            )*
            Ok((self)($($param,)*))
        }
    }
});

callable_tuple! {}
callable_tuple! { A }
callable_tuple! { A B }
callable_tuple! { A B C }
callable_tuple! { A B C D }
callable_tuple! { A B C D E }
callable_tuple! { A B C D E F }
callable_tuple! { A B C D E F G }
callable_tuple! { A B C D E F G H }
callable_tuple! { A B C D E F G H I }
callable_tuple! { A B C D E F G H I J }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::instance;
    use crate::error::ErrorKind;

    fn arity_of<F: Callable<Args, Ret>, Args, Ret>(_f: &F) -> usize {
        F::ARITY
    }

    #[test]
    fn arguments_are_downcast_in_order() {
        let concat = |a: Arc<String>, b: Arc<i32>| format!("{}{}", a, b);
        assert_eq!(arity_of(&concat), 2);

        let args = [instance("x".to_string()), instance(5_i32)];
        assert_eq!(concat.call_with("Concat", &args).unwrap(), "x5");

        let swapped = [instance(5_i32), instance("x".to_string())];
        let err = concat.call_with("Concat", &swapped).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);

        let err = concat.call_with("Concat", &args[..1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);
    }

    #[test]
    fn functions_without_parameters() {
        let unit = || 3_u8;
        assert_eq!(arity_of(&unit), 0);
        assert_eq!(unit.call_with("Unit", &[]).unwrap(), 3);
    }
}
