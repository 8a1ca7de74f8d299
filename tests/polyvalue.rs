#[macro_use]
extern crate polyvalue;

use polyvalue::space::*;
use polyvalue::PolyValue;
use static_assertions::{assert_impl_all, assert_not_impl_any};

trait TestTrait {
    fn get_value(&self) -> u32;
}

assert_impl_all!(PolyValue<dyn TestTrait + Send + Sync, S4>: Send, Sync, Clone, Default);
assert_not_impl_any!(PolyValue<dyn TestTrait, S4>: Send, Sync);
assert_not_impl_any!(PolyValue<dyn TestTrait + Send, S4>: Sync);

// A trivial check that ensures that methods are correctly called
#[test]
fn basic() {
    let val: PolyValue<dyn PartialEq<u32>> = poly!(1234u32);
    assert!(*val == 1234);
}

#[test]
fn many_instances() {
    #[inline(never)]
    fn instance_one() -> PolyValue<dyn TestTrait> {
        #[derive(Debug, Clone)]
        struct OneStruct(u32);
        impl TestTrait for OneStruct {
            fn get_value(&self) -> u32 {
                self.0
            }
        }
        poly!(OneStruct(12345))
    }

    #[inline(never)]
    fn instance_two() -> PolyValue<dyn TestTrait> {
        #[derive(Debug, Clone)]
        struct TwoStruct;
        impl TestTrait for TwoStruct {
            fn get_value(&self) -> u32 {
                54321
            }
        }
        poly!(TwoStruct)
    }

    #[inline(never)]
    fn instance_three() -> PolyValue<[u8]> {
        poly!([0u8; 8])
    }

    let i1 = instance_one();
    let i2 = instance_two();
    let i3: PolyValue<[u8]> = instance_three();
    assert_eq!(i1.get_value(), 12345);
    assert_eq!(i2.get_value(), 54321);
    assert_eq!(i3.len(), 8);
}

#[test]
fn closure() {
    let v1 = 1234u64;
    let c: PolyValue<dyn Fn() -> String> = poly!(move || format!("{}", v1));
    assert_eq!(c(), "1234");

    let copy = c.clone();
    drop(c);
    assert_eq!(copy(), "1234");
}

#[test]
fn heap_fallback() {
    const MAX_SIZE: usize = 8;

    let small: PolyValue<[usize]> = poly!([8usize; MAX_SIZE]);
    let medium: PolyValue<[usize]> = poly!([7usize; MAX_SIZE + 1]);
    let huge: PolyValue<[usize]> = poly!([6usize; 10000]);
    assert!(small.is_inline());
    assert!(medium.is_heap());
    assert!(huge.is_heap());
    assert!(small.iter().eq([8usize; MAX_SIZE].iter()));
    assert!(medium.iter().eq([7usize; MAX_SIZE + 1].iter()));
    assert!(huge.iter().eq([6usize; 10000].iter()));
}

#[test]
fn space_size() {
    assert!(PolyValue::<[usize], S4>::is_inline(&poly!([0usize; 4])));
    assert!(!PolyValue::<[usize], S4>::is_inline(&poly!([0usize; 4 + 1])));
    assert!(PolyValue::<[usize], S8>::is_inline(&poly!([0usize; 8])));
    assert!(!PolyValue::<[usize], S8>::is_inline(&poly!([0usize; 8 + 1])));
    assert!(PolyValue::<[u32], [u64; 4]>::is_inline(&poly!([0u32; 8])));
    assert!(!PolyValue::<[u32], [u64; 4]>::is_inline(&poly!([0u32; 8 + 1])));
}

#[test]
fn storage_choice_is_stable() {
    for _ in 0..3 {
        let inline: PolyValue<dyn TestTrait, S2> = poly!(Fixed([1; 2]));
        let heap: PolyValue<dyn TestTrait, S2> = poly!(Fixed([1; 3]));
        assert!(inline.is_inline());
        assert!(heap.is_heap());
        assert_eq!(inline.clone().is_inline(), inline.is_inline());
        assert_eq!(heap.clone().is_heap(), heap.is_heap());
    }

    #[derive(Clone)]
    struct Fixed<const N: usize>([usize; N]);
    impl<const N: usize> TestTrait for Fixed<N> {
        fn get_value(&self) -> u32 {
            self.0.iter().map(|&x| x as u32).sum()
        }
    }
}

#[test]
fn reassignment_rederives_storage() {
    let mut slot: PolyValue<[u16], S1> = poly!([1u16; 2]);
    assert!(slot.is_inline());

    slot = poly!([2u16; 16]);
    assert!(slot.is_heap());
    assert_eq!(slot.len(), 16);

    slot = poly!([3u16; 4]);
    assert!(slot.is_inline());
    assert_eq!(*slot, [3; 4]);
}

#[test]
fn copies_are_independent() {
    #[derive(Clone, PartialEq, Debug)]
    struct Counter {
        hits: Vec<u32>,
    }

    trait Record {
        fn record(&mut self, hit: u32);
        fn hits(&self) -> &[u32];
    }

    impl Record for Counter {
        fn record(&mut self, hit: u32) {
            self.hits.push(hit);
        }
        fn hits(&self) -> &[u32] {
            &self.hits
        }
    }

    let original: PolyValue<dyn Record, S4> = poly!(Counter { hits: vec![1] });
    let mut copy = original.clone();
    copy.record(2);
    assert_eq!(original.hits(), &[1]);
    assert_eq!(copy.hits(), &[1, 2]);

    let original: PolyValue<dyn Record, S1> = poly!(Counter { hits: vec![1] });
    assert!(original.is_heap());
    let mut copy = original.clone();
    copy.record(3);
    assert_eq!(original.hits(), &[1]);
    assert_eq!(copy.hits(), &[1, 3]);
}

#[test]
fn future() {
    use futures::future::{self, Future};

    let fut: PolyValue<dyn Future<Output = u32> + Unpin> = poly!(future::ready(7u32));
    let mut again = fut.clone();
    assert_eq!(futures::executor::block_on(&mut *again), 7);

    let mut fut = fut;
    assert_eq!(futures::executor::block_on(&mut *fut), 7);
}

#[test]
fn upcast() {
    use std::fmt::Debug;

    trait Labeled: Debug {
        fn label(&self) -> String;
    }

    #[derive(Debug, Clone)]
    struct Tag(&'static str);
    impl Labeled for Tag {
        fn label(&self) -> String {
            self.0.to_uppercase()
        }
    }

    let labeled: PolyValue<dyn Labeled, S4> = poly!(Tag("inline"));
    let debug: PolyValue<dyn Debug, S4> = poly_upcast!(labeled);
    assert!(debug.is_inline());
    assert!(debug.is::<Tag>());
    assert_eq!(format!("{:?}", debug), "Tag(\"inline\")");

    let labeled: PolyValue<dyn Labeled, S1> = poly!(Tag("heap"));
    let copied = poly_upcast!(labeled.clone() => dyn Debug);
    assert!(copied.is_heap());
    assert_eq!(labeled.label(), "HEAP");
    assert_eq!(format!("{:?}", copied), "Tag(\"heap\")");

    let empty: PolyValue<dyn Debug, S1> = poly_upcast!(PolyValue::<dyn Labeled, S1>::empty());
    assert!(!empty.has_value());
}

#[test]
fn upcast_keeps_payload_and_auto_traits() {
    use std::rc::Rc;

    #[derive(Clone)]
    struct Shared(Rc<u8>);
    impl TestTrait for Shared {
        fn get_value(&self) -> u32 {
            u32::from(*self.0)
        }
    }

    let rc = Rc::new(9u8);
    let concrete = PolyValue::<Shared, S4>::new(Shared(rc.clone()));
    let erased: PolyValue<dyn TestTrait, S4> = poly_upcast!(concrete);
    assert_not_impl_any!(PolyValue<dyn TestTrait, S4>: Send);

    assert!(erased.is::<Shared>());
    assert_eq!(erased.get_value(), 9);

    let copy = erased.clone();
    assert_eq!(Rc::strong_count(&rc), 3);
    drop(erased);
    drop(copy);
    assert_eq!(Rc::strong_count(&rc), 1);

    let sendable: PolyValue<dyn TestTrait + Send, S4> = poly!(Fixed([1, 2]));
    let erased: PolyValue<dyn TestTrait + Send, S4> = poly_upcast!(sendable);
    assert_impl_all!(PolyValue<dyn TestTrait + Send, S4>: Send);
    assert_eq!(std::thread::spawn(move || erased.get_value()).join().unwrap(), 3);

    #[derive(Clone)]
    struct Fixed([u32; 2]);
    impl TestTrait for Fixed {
        fn get_value(&self) -> u32 {
            self.0.iter().sum()
        }
    }
}

#[test]
fn zst() {
    use std::any::Any;

    let s: PolyValue<dyn Any> = poly!([0usize; 0]);
    assert!(s.is_inline());
    assert_eq!(s.downcast_ref::<[usize; 0]>(), Some(&[0usize; 0]));
}
