// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal JVM class-file reader.
//!
//! Extracts only what test detection needs: the class and superclass names,
//! access flags, and the annotation type descriptors declared on the class and
//! on its methods. Everything else in the file is skipped structurally.

use thiserror::Error;

#[cfg(test)]
#[path = "classfile_tests.rs"]
mod tests;

const MAGIC: u32 = 0xCAFE_BABE;

const ACC_PUBLIC: u16 = 0x0001;
const ACC_INTERFACE: u16 = 0x0200;
const ACC_ABSTRACT: u16 = 0x0400;
const ACC_SYNTHETIC: u16 = 0x1000;
const ACC_ANNOTATION: u16 = 0x2000;
const ACC_MODULE: u16 = 0x8000;

const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";

/// Nesting limit for annotation element values.
const MAX_ELEMENT_DEPTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassFileError {
    #[error("truncated class file at offset {offset}")]
    Truncated { offset: usize },

    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownTag { tag: u8, index: u16 },

    #[error("constant pool index {index} is not a {expected} entry")]
    BadConstant { index: u16, expected: &'static str },

    #[error("unknown annotation element tag {0:#04x}")]
    BadElementTag(u8),

    #[error("annotation element values nested too deeply")]
    TooDeep,
}

/// Class access flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFlags(pub u16);

impl AccessFlags {
    pub fn is_public(self) -> bool {
        self.0 & ACC_PUBLIC != 0
    }

    pub fn is_interface(self) -> bool {
        self.0 & (ACC_INTERFACE | ACC_ANNOTATION) != 0
    }

    pub fn is_abstract(self) -> bool {
        self.0 & ACC_ABSTRACT != 0
    }

    pub fn is_synthetic(self) -> bool {
        self.0 & ACC_SYNTHETIC != 0
    }

    pub fn is_module(self) -> bool {
        self.0 & ACC_MODULE != 0
    }
}

/// The parts of a class file that test detection looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSummary {
    /// Binary name with dots (`com.acme.FooTest`, `com.acme.Outer$Inner`).
    pub name: String,
    /// Superclass binary name; `None` only for `java.lang.Object` and modules.
    pub super_name: Option<String>,
    pub access: AccessFlags,
    pub interfaces: Vec<String>,
    /// Annotation descriptors on the class itself (`Lorg/junit/runner/RunWith;`).
    pub class_annotations: Vec<String>,
    /// Annotation descriptors found on any method.
    pub method_annotations: Vec<String>,
}

impl ClassSummary {
    /// Parse a class file.
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFileError> {
        let mut r = Reader::new(bytes);

        let magic = r.u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let _minor = r.u16()?;
        let _major = r.u16()?;

        let pool = ConstantPool::read(&mut r)?;

        let access = AccessFlags(r.u16()?);
        let name = binary_name(pool.class_name(r.u16()?)?);
        let super_index = r.u16()?;
        let super_name = if super_index == 0 {
            None
        } else {
            Some(binary_name(pool.class_name(super_index)?))
        };

        let interface_count = r.u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(binary_name(pool.class_name(r.u16()?)?));
        }

        // Fields: annotations on fields are irrelevant for detection.
        let field_count = r.u16()?;
        for _ in 0..field_count {
            r.skip(6)?;
            skip_attributes(&mut r)?;
        }

        let mut method_annotations = Vec::new();
        let method_count = r.u16()?;
        for _ in 0..method_count {
            r.skip(6)?;
            read_attributes(&mut r, &pool, &mut method_annotations)?;
        }

        let mut class_annotations = Vec::new();
        read_attributes(&mut r, &pool, &mut class_annotations)?;

        Ok(Self {
            name,
            super_name,
            access,
            interfaces,
            class_annotations,
            method_annotations,
        })
    }

    /// Whether this is a compiler-generated anonymous class (`Outer$1`).
    pub fn is_anonymous(&self) -> bool {
        self.name
            .rsplit_once('$')
            .is_some_and(|(_, tail)| !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()))
    }
}

/// Convert an internal name (`com/acme/Foo`) to a binary name (`com.acme.Foo`).
pub fn binary_name(internal: &str) -> String {
    internal.replace('/', ".")
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(ClassFileError::Truncated { offset: self.pos })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<(), ClassFileError> {
        self.take(n).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ClassFileError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ClassFileError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

enum Constant {
    Utf8(String),
    Class(u16),
    Other,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn read(r: &mut Reader<'_>) -> Result<Self, ClassFileError> {
        let count = r.u16()?;
        let mut entries = Vec::with_capacity(count as usize);
        // Index 0 is unused.
        entries.push(Constant::Other);

        let mut index: u16 = 1;
        while index < count {
            let tag = r.u8()?;
            let mut wide = false;
            let entry = match tag {
                1 => {
                    let len = r.u16()? as usize;
                    Constant::Utf8(String::from_utf8_lossy(r.take(len)?).into_owned())
                }
                7 => Constant::Class(r.u16()?),
                3 | 4 => {
                    r.skip(4)?;
                    Constant::Other
                }
                5 | 6 => {
                    r.skip(8)?;
                    wide = true;
                    Constant::Other
                }
                8 | 16 | 19 | 20 => {
                    r.skip(2)?;
                    Constant::Other
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    r.skip(4)?;
                    Constant::Other
                }
                15 => {
                    r.skip(3)?;
                    Constant::Other
                }
                _ => return Err(ClassFileError::UnknownTag { tag, index }),
            };
            entries.push(entry);
            index += 1;
            // Long and double occupy two slots.
            if wide {
                entries.push(Constant::Other);
                index = index.saturating_add(1);
            }
        }

        Ok(Self { entries })
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.entries.get(index as usize) {
            Some(Constant::Utf8(s)) => Ok(s),
            _ => Err(ClassFileError::BadConstant { index, expected: "Utf8" }),
        }
    }

    fn class_name(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.entries.get(index as usize) {
            Some(Constant::Class(name_index)) => self.utf8(*name_index),
            _ => Err(ClassFileError::BadConstant { index, expected: "Class" }),
        }
    }
}

fn skip_attributes(r: &mut Reader<'_>) -> Result<(), ClassFileError> {
    let count = r.u16()?;
    for _ in 0..count {
        r.skip(2)?;
        let len = r.u32()? as usize;
        r.skip(len)?;
    }
    Ok(())
}

/// Read an attribute table, collecting annotation descriptors into `out`.
fn read_attributes(
    r: &mut Reader<'_>,
    pool: &ConstantPool,
    out: &mut Vec<String>,
) -> Result<(), ClassFileError> {
    let count = r.u16()?;
    for _ in 0..count {
        let name = pool.utf8(r.u16()?)?;
        let len = r.u32()? as usize;
        let body = r.take(len)?;
        if name == RUNTIME_VISIBLE_ANNOTATIONS || name == RUNTIME_INVISIBLE_ANNOTATIONS {
            let mut inner = Reader::new(body);
            let num = inner.u16()?;
            for _ in 0..num {
                read_annotation(&mut inner, pool, out, 0)?;
            }
        }
    }
    Ok(())
}

fn read_annotation(
    r: &mut Reader<'_>,
    pool: &ConstantPool,
    out: &mut Vec<String>,
    depth: usize,
) -> Result<(), ClassFileError> {
    let descriptor = pool.utf8(r.u16()?)?;
    // Nested annotations are element values, not declarations.
    if depth == 0 && !out.iter().any(|d| d == descriptor) {
        out.push(descriptor.to_string());
    }
    let pairs = r.u16()?;
    for _ in 0..pairs {
        r.skip(2)?;
        skip_element_value(r, pool, depth + 1)?;
    }
    Ok(())
}

fn skip_element_value(
    r: &mut Reader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> Result<(), ClassFileError> {
    if depth > MAX_ELEMENT_DEPTH {
        return Err(ClassFileError::TooDeep);
    }
    match r.u8()? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => r.skip(2),
        b'e' => r.skip(4),
        b'@' => {
            let mut ignored = Vec::new();
            read_annotation(r, pool, &mut ignored, depth)
        }
        b'[' => {
            let n = r.u16()?;
            for _ in 0..n {
                skip_element_value(r, pool, depth + 1)?;
            }
            Ok(())
        }
        tag => Err(ClassFileError::BadElementTag(tag)),
    }
}
