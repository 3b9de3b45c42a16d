use std::{
    mem,
    sync::{Arc, Once, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use super::Catalog;
use crate::{
    storage::buffer_pool::BufferPool, transaction::ConcurrentStatus, types::Pod,
    utils::HandyRwLock,
};

/// We collect all global variables here.
///
/// These variables cannot be initialized as static variables, because
/// their initialization functions all rely on non-const fn (e.g.
/// `HashMap::new()`).
pub struct Database {
    buffer_pool: Pod<BufferPool>,
    catalog: Pod<Catalog>,
    concurrent_status: Pod<ConcurrentStatus>,
}

static mut SINGLETON: *mut Database = 0 as *mut Database;

impl Database {
    fn new() -> Self {
        Self {
            buffer_pool: Arc::new(RwLock::new(BufferPool::new())),
            catalog: Arc::new(RwLock::new(Catalog::new())),
            concurrent_status: Arc::new(RwLock::new(ConcurrentStatus::new())),
        }
    }

    /// Reset the in-memory state of the database, used for tests
    /// mostly.
    ///
    /// Actions:
    /// - Page cache will be cleared.
    /// - Catalog will be cleared.
    /// - Latch registry will be cleared.
    pub fn reset() {
        // make sure the first-use initialization already ran, so it
        // cannot clobber the instance installed below
        Self::global();

        let singleton = Self::new();

        unsafe {
            if !SINGLETON.is_null() {
                // Drop the previous db instance if it's already
                // initialized.
                mem::drop(Box::from_raw(SINGLETON));
            }

            // Put it in the heap so it can outlive this call.
            SINGLETON = mem::transmute(Box::new(singleton));
        }
    }

    pub fn buffer_pool() -> RwLockReadGuard<'static, BufferPool> {
        Self::global().buffer_pool.rl()
    }

    pub fn mut_buffer_pool() -> RwLockWriteGuard<'static, BufferPool> {
        Self::global().buffer_pool.wl()
    }

    pub fn catalog() -> RwLockReadGuard<'static, Catalog> {
        Self::global().catalog.rl()
    }

    pub fn mut_catalog() -> RwLockWriteGuard<'static, Catalog> {
        Self::global().catalog.wl()
    }

    pub fn concurrent_status() -> RwLockReadGuard<'static, ConcurrentStatus> {
        Self::global().concurrent_status.rl()
    }

    pub fn mut_concurrent_status() -> RwLockWriteGuard<'static, ConcurrentStatus> {
        Self::global().concurrent_status.wl()
    }

    pub fn global() -> &'static Self {
        static ONCE: Once = Once::new();

        ONCE.call_once(|| {
            let singleton = Self::new();

            unsafe {
                // Put it in the heap so it can outlive this call
                SINGLETON = mem::transmute(Box::new(singleton));
            }
        });

        unsafe { SINGLETON.as_ref().unwrap() }
    }
}
