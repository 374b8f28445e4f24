use std::collections::HashMap;

use windows_sys::Win32::Foundation::{CloseHandle, FILETIME, HANDLE, HWND};
use windows_sys::Win32::System::Threading::{
    GetProcessTimes, OpenProcess, QueryFullProcessImageNameW, PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId};

use crate::error::Result;
use crate::identity::{AppIdentity, IdentityResolver};

const PROCESS_CACHE_LIMIT: usize = 4096;

/// Pids get reused; the creation time makes the key unique.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct ProcessKey {
    pid: u32,
    creation_time: u64,
}

pub struct WindowsResolver {
    process_cache: HashMap<ProcessKey, AppIdentity>,
}

impl WindowsResolver {
    pub fn connect() -> Result<Self> {
        Ok(Self {
            process_cache: HashMap::new(),
        })
    }

    fn identity_for_pid(&mut self, pid: u32) -> AppIdentity {
        let Some(creation_time) = process_creation_time(pid) else {
            return process_path(pid)
                .map(AppIdentity::from_path)
                .unwrap_or_else(AppIdentity::unknown);
        };

        let key = ProcessKey { pid, creation_time };
        if let Some(identity) = self.process_cache.get(&key) {
            return identity.clone();
        }

        match process_path(pid) {
            Some(path) => {
                let identity = AppIdentity::from_path(path);
                if self.process_cache.len() >= PROCESS_CACHE_LIMIT {
                    self.process_cache.clear();
                }
                self.process_cache.insert(key, identity.clone());
                identity
            }
            None => AppIdentity::unknown(),
        }
    }
}

impl IdentityResolver for WindowsResolver {
    fn resolve(&mut self) -> Result<Option<AppIdentity>> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.is_null() {
            return Ok(None);
        }

        match window_pid(hwnd) {
            Some(pid) => Ok(Some(self.identity_for_pid(pid))),
            None => Ok(Some(AppIdentity::unknown())),
        }
    }
}

fn window_pid(hwnd: HWND) -> Option<u32> {
    let mut pid: u32 = 0;
    unsafe {
        GetWindowThreadProcessId(hwnd, &mut pid);
    }
    if pid == 0 {
        None
    } else {
        Some(pid)
    }
}

fn process_creation_time(pid: u32) -> Option<u64> {
    with_process_handle(pid, |handle| {
        let mut creation = zero_filetime();
        let mut exit = zero_filetime();
        let mut kernel = zero_filetime();
        let mut user = zero_filetime();

        let ok = unsafe { GetProcessTimes(handle, &mut creation, &mut exit, &mut kernel, &mut user) };
        if ok == 0 {
            return None;
        }
        Some(filetime_to_u64(creation))
    })
}

fn process_path(pid: u32) -> Option<String> {
    with_process_handle(pid, |handle| {
        let mut buffer: Vec<u16> = vec![0; 4096];
        let mut size: u32 = buffer.len() as u32;
        let ok = unsafe { QueryFullProcessImageNameW(handle, 0, buffer.as_mut_ptr(), &mut size) };
        if ok == 0 || size == 0 {
            return None;
        }
        Some(String::from_utf16_lossy(&buffer[..size as usize]))
    })
}

fn with_process_handle<T>(pid: u32, f: impl FnOnce(HANDLE) -> Option<T>) -> Option<T> {
    let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid) };
    if handle.is_null() {
        return None;
    }

    let result = f(handle);
    unsafe {
        CloseHandle(handle);
    }
    result
}

fn zero_filetime() -> FILETIME {
    FILETIME {
        dwLowDateTime: 0,
        dwHighDateTime: 0,
    }
}

fn filetime_to_u64(value: FILETIME) -> u64 {
    ((value.dwHighDateTime as u64) << 32) | (value.dwLowDateTime as u64)
}
