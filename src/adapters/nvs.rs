//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`StoragePort`] and [`ConfigPort`] for KeyGuard.
//!
//! The persistent byte store is a fixed [`STORE_SIZE`]-byte image cached in
//! RAM.  Reads come from the cache.  A write that changes a byte updates
//! the cache and commits the whole image as one NVS blob, so every byte
//! write is individually durable and writes of an unchanged value cost
//! nothing.
//!
//! # Security
//!
//! - Config validation: all fields are range-checked before persistence.
//! - Encrypted NVS: on ESP32 the `keyguard` namespace can live on the
//!   encrypted NVS partition.  The simulation backend is plaintext
//!   (dev/test only).
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::AccessConfig;
use crate::layout::STORE_SIZE;
use log::info;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Value of a never-written flash byte.
pub const ERASED: u8 = 0xFF;

#[cfg(target_os = "espidf")]
const NAMESPACE: &[u8] = b"keyguard\0";
#[cfg(target_os = "espidf")]
const IMAGE_KEY: &[u8] = b"image\0";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &[u8] = b"cfg\0";
#[cfg(target_os = "espidf")]
const MAX_CONFIG_BLOB: usize = 256;

pub struct NvsAdapter {
    image: [u8; STORE_SIZE],
    /// Bytes whose value actually changed since construction.
    write_count: usize,
    #[cfg(not(target_os = "espidf"))]
    config_blob: std::cell::RefCell<Option<Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter, initialise NVS flash, and load the image.
    ///
    /// Returns `Err(StorageError::IoError)` if flash initialisation fails
    /// unrecoverably.  On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically; a missing
    /// image reads as erased flash.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(StorageError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(StorageError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(StorageError::IoError);
            }

            let mut image = [ERASED; STORE_SIZE];
            let result = Self::with_nvs_handle(false, |handle| {
                let mut size = image.len();
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        IMAGE_KEY.as_ptr() as *const _,
                        image.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => info!("NvsAdapter: loaded {} byte image", size),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: no stored image, starting erased")
                }
                Err(e) => {
                    warn!("NvsAdapter: image read error {}", e);
                    return Err(StorageError::IoError);
                }
            }

            Ok(Self {
                image,
                write_count: 0,
            })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("NvsAdapter: simulation backend");
            Ok(Self::from_image([ERASED; STORE_SIZE]))
        }
    }

    /// Simulation backend preloaded with `image` (power-cycle and fuzz
    /// tests).
    #[cfg(not(target_os = "espidf"))]
    pub fn from_image(image: [u8; STORE_SIZE]) -> Self {
        Self {
            image,
            write_count: 0,
            config_blob: std::cell::RefCell::new(None),
        }
    }

    /// Current contents of the byte store.
    pub fn image(&self) -> &[u8; STORE_SIZE] {
        &self.image
    }

    /// Number of byte writes that changed the medium.
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// Open the namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn commit_blob(key: &[u8], data: &[u8]) -> Result<(), i32> {
        Self::with_nvs_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    key.as_ptr() as *const _,
                    data.as_ptr() as *const _,
                    data.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
    }
}

impl StoragePort for NvsAdapter {
    fn read_byte(&self, addr: u16) -> Result<u8, StorageError> {
        self.image
            .get(addr as usize)
            .copied()
            .ok_or(StorageError::AddressOutOfRange(addr))
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), StorageError> {
        let idx = addr as usize;
        let current = *self
            .image
            .get(idx)
            .ok_or(StorageError::AddressOutOfRange(addr))?;
        if current == value {
            return Ok(());
        }

        self.image[idx] = value;

        #[cfg(target_os = "espidf")]
        {
            if let Err(e) = Self::commit_blob(IMAGE_KEY, &self.image) {
                warn!("NvsAdapter: image commit error {} at byte {}", e, addr);
                self.image[idx] = current;
                return Err(StorageError::IoError);
            }
        }

        self.write_count += 1;
        Ok(())
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<AccessConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if let Some(bytes) = self.config_blob.borrow().as_ref() {
                let cfg: AccessConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config from store");
                Ok(cfg)
            } else {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(AccessConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let mut buf = [0u8; MAX_CONFIG_BLOB];
            let result = Self::with_nvs_handle(false, |handle| {
                let mut size = buf.len();
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        CONFIG_KEY.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(size)
            });

            match result {
                Ok(size) => {
                    let cfg: AccessConfig =
                        postcard::from_bytes(&buf[..size]).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", size);
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(AccessConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}, using defaults", e);
                    Ok(AccessConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &AccessConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            *self.config_blob.borrow_mut() = Some(bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            match Self::commit_blob(CONFIG_KEY, &bytes) {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}
