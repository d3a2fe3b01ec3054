//! Read access to packed sample containers (NumPy `.npz` archives).
//!
//! An `.npz` file is a zip archive whose members are `.npy` arrays. Members
//! are listed in archive order, which is the order the generator saved them
//! in. Opening a container only parses the `.npy` headers; array data is
//! read on demand.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;

const NPY_SUFFIX: &str = ".npy";

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid zip archive {path}: {message}")]
    Zip { path: PathBuf, message: String },
    #[error("array {name:?} in {path} could not be decoded: {source}")]
    Npy {
        path: PathBuf,
        name: String,
        source: std::io::Error,
    },
    #[error("array {name:?} has unsupported layout: {reason}")]
    Unsupported { name: String, reason: String },
    #[error("no array named {0:?}")]
    MissingArray(String),
}

/// Element type of an array as declared by its `.npy` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    Bool,
    /// Signed integer with the given width in bytes.
    Int(u8),
    /// Unsigned integer with the given width in bytes.
    UInt(u8),
    /// Floating point with the given width in bytes.
    Float(u8),
    /// Anything else, kept as the raw numpy type string.
    Other(String),
}

impl ElementType {
    /// Parse a numpy type string such as `|u1` or `<i8`.
    pub fn from_descr(descr: &str) -> Self {
        let body = descr.trim_start_matches(['<', '>', '|', '=']);
        let mut chars = body.chars();
        let kind = chars.next();
        let width = chars.as_str().parse::<u8>().ok();
        match (kind, width) {
            (Some('b'), Some(1)) => Self::Bool,
            (Some('i'), Some(w @ (1 | 2 | 4 | 8))) => Self::Int(w),
            (Some('u'), Some(w @ (1 | 2 | 4 | 8))) => Self::UInt(w),
            (Some('f'), Some(w @ (2 | 4 | 8))) => Self::Float(w),
            _ => Self::Other(descr.to_string()),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_) | Self::UInt(_))
    }

    pub fn is_u8(&self) -> bool {
        *self == Self::UInt(1)
    }
}

/// Name, element type and shape of one array in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayInfo {
    pub name: String,
    pub element: ElementType,
    pub shape: Vec<u64>,
}

impl ArrayInfo {
    pub fn new(name: impl Into<String>, element: ElementType, shape: Vec<u64>) -> Self {
        Self {
            name: name.into(),
            element,
            shape,
        }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Size of the leading dimension (0 for scalars).
    pub fn len(&self) -> usize {
        self.shape.first().map_or(0, |n| *n as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An opened `.npz` container.
pub struct SampleContainer {
    path: PathBuf,
    archive: zip::ZipArchive<BufReader<File>>,
    arrays: Vec<ArrayInfo>,
    c_order: Vec<bool>,
    entries: Vec<usize>,
}

impl SampleContainer {
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        let file = File::open(path).map_err(|source| ContainerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive =
            zip::ZipArchive::new(BufReader::new(file)).map_err(|err| ContainerError::Zip {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;

        let mut arrays = Vec::new();
        let mut c_order = Vec::new();
        let mut entries = Vec::new();
        for index in 0..archive.len() {
            let entry = archive.by_index(index).map_err(|err| ContainerError::Zip {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
            if entry.is_dir() {
                continue;
            }
            let entry_name = entry.name().to_string();
            let name = entry_name
                .strip_suffix(NPY_SUFFIX)
                .unwrap_or(&entry_name)
                .to_string();
            let npy = npyz::NpyFile::new(entry).map_err(|source| ContainerError::Npy {
                path: path.to_path_buf(),
                name: name.clone(),
                source,
            })?;
            let element = match npy.dtype() {
                npyz::DType::Plain(type_str) => ElementType::from_descr(&type_str.to_string()),
                other => ElementType::Other(format!("{other:?}")),
            };
            c_order.push(matches!(npy.order(), npyz::Order::C) || npy.shape().len() <= 1);
            arrays.push(ArrayInfo::new(name, element, npy.shape().to_vec()));
            entries.push(index);
        }

        Ok(Self {
            path: path.to_path_buf(),
            archive,
            arrays,
            c_order,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Arrays in archive order.
    pub fn arrays(&self) -> &[ArrayInfo] {
        &self.arrays
    }

    /// Read a `u8` array in row-major order.
    pub fn read_u8(&mut self, name: &str) -> Result<Vec<u8>, ContainerError> {
        let position = self.position_of(name)?;
        let info = &self.arrays[position];
        if !info.element.is_u8() {
            return Err(ContainerError::Unsupported {
                name: name.to_string(),
                reason: format!("expected uint8 elements, found {:?}", info.element),
            });
        }
        if !self.c_order[position] {
            return Err(ContainerError::Unsupported {
                name: name.to_string(),
                reason: "fortran-ordered arrays are not supported".to_string(),
            });
        }
        self.read_vec::<u8>(position)
    }

    /// Read an integer array of any width as `i64` values.
    pub fn read_integers(&mut self, name: &str) -> Result<Vec<i64>, ContainerError> {
        let position = self.position_of(name)?;
        let element = self.arrays[position].element.clone();
        let values = match element {
            ElementType::Int(1) => widen(self.read_vec::<i8>(position)?),
            ElementType::Int(2) => widen(self.read_vec::<i16>(position)?),
            ElementType::Int(4) => widen(self.read_vec::<i32>(position)?),
            ElementType::Int(8) => self.read_vec::<i64>(position)?,
            ElementType::UInt(1) => widen(self.read_vec::<u8>(position)?),
            ElementType::UInt(2) => widen(self.read_vec::<u16>(position)?),
            ElementType::UInt(4) => widen(self.read_vec::<u32>(position)?),
            ElementType::UInt(8) => {
                let raw = self.read_vec::<u64>(position)?;
                raw.into_iter()
                    .map(|value| {
                        i64::try_from(value).map_err(|_| ContainerError::Unsupported {
                            name: name.to_string(),
                            reason: format!("label value {value} exceeds i64"),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?
            }
            other => {
                return Err(ContainerError::Unsupported {
                    name: name.to_string(),
                    reason: format!("expected integer elements, found {other:?}"),
                });
            }
        };
        Ok(values)
    }

    fn position_of(&self, name: &str) -> Result<usize, ContainerError> {
        self.arrays
            .iter()
            .position(|info| info.name == name)
            .ok_or_else(|| ContainerError::MissingArray(name.to_string()))
    }

    fn read_vec<T: npyz::Deserialize>(&mut self, position: usize) -> Result<Vec<T>, ContainerError> {
        let name = self.arrays[position].name.clone();
        let entry = self
            .archive
            .by_index(self.entries[position])
            .map_err(|err| ContainerError::Zip {
                path: self.path.clone(),
                message: err.to_string(),
            })?;
        let npy_err = |source| ContainerError::Npy {
            path: self.path.clone(),
            name: name.clone(),
            source,
        };
        let npy = npyz::NpyFile::new(entry).map_err(npy_err)?;
        npy.into_vec::<T>().map_err(npy_err)
    }
}

fn widen<T: Into<i64>>(values: Vec<T>) -> Vec<i64> {
    values.into_iter().map(Into::into).collect()
}
