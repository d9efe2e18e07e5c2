use std::{
    ops::{Deref, DerefMut},
    ptr,
};

/// Owned sqlite handle, released with `dealloc` unless null.
#[derive(Debug)]
pub(crate) struct CBox<T> {
    pub(crate) ptr: *mut T,
    dealloc: fn(*mut T),
}

impl<T> CBox<T> {
    pub fn new(ptr: *mut T, dealloc: fn(*mut T)) -> Self {
        Self { ptr, dealloc }
    }

    pub fn null(dealloc: fn(*mut T)) -> Self {
        Self::new(ptr::null_mut(), dealloc)
    }

    /// Copy of the pointer that never releases it.
    pub fn borrowed(&self) -> Self {
        Self::new(self.ptr, |_| {})
    }
}

impl<T> Drop for CBox<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            (self.dealloc)(self.ptr);
        }
    }
}

impl<T> Deref for CBox<T> {
    type Target = *mut T;

    fn deref(&self) -> &Self::Target {
        &self.ptr
    }
}

impl<T> DerefMut for CBox<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ptr
    }
}

unsafe impl<T> Send for CBox<T> {}
unsafe impl<T> Sync for CBox<T> {}

#[cfg(test)]
mod tests {
    use super::CBox;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cbox_raw_pointer() {
        static RELEASED: AtomicUsize = AtomicUsize::new(0);
        let mut v = 123;
        {
            let ptr = CBox::<i32>::null(|_| {
                RELEASED.fetch_add(1, Ordering::Relaxed);
            });
            assert!(ptr.is_null());
        }
        assert_eq!(RELEASED.load(Ordering::Relaxed), 0);
        {
            let ptr = CBox::new(&mut v as *mut i32, |_| {
                RELEASED.fetch_add(1, Ordering::Relaxed);
            });
            let copy = ptr.borrowed();
            drop(copy);
            assert_eq!(RELEASED.load(Ordering::Relaxed), 0);
            assert_eq!(unsafe { **ptr }, 123);
        }
        assert_eq!(RELEASED.load(Ordering::Relaxed), 1);
    }
}
