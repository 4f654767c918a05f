//! Обёртки над std-блокировками.
//!
//! Отравленная блокировка (паника в другом потоке под локом) не должна валить
//! весь сервис бронирования: все состояния под локами меняются одной
//! операцией присваивания, поэтому данные внутри всегда согласованы
//! и их можно забирать через `PoisonError::into_inner`.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
