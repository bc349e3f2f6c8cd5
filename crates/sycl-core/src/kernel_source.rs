//! Symbolic kernel bodies.
//!
//! A [`KernelFunctor`] describes its kernel by writing statements into a
//! [`KernelSource`]. Accessors indexed inside the body register the resource
//! they view; each registered resource becomes one kernel parameter, in
//! registration order. Nothing is compiled until a program asks for it.

use std::fmt;

use crate::error::{ErrorCode, Result, report_code};
use crate::refc::{MemKind, Refc};

/// A kernel described in code, identified by a caller-chosen stable name.
pub trait KernelFunctor {
    /// Kernel function name; also the key programs register the kernel under.
    const NAME: &'static str;

    fn define(&self, src: &mut KernelSource) -> Result<()>;
}

/// Identity of a resource bound into a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Buffer(usize),
    Local(usize),
}

/// How a kernel parameter is fed at enqueue time.
#[derive(Debug, Clone)]
pub enum ArgBinding {
    Mem(Refc<MemKind>),
    Local { bytes: usize },
}

#[derive(Debug, Clone)]
pub(crate) struct Resource {
    pub(crate) id: ResourceId,
    pub(crate) name: String,
    pub(crate) decl: String,
    pub(crate) binding: ArgBinding,
}

#[derive(Debug, Clone)]
pub struct KernelSource {
    name: String,
    resources: Vec<Resource>,
    body: Vec<String>,
}

impl KernelSource {
    /// Starts an empty kernel; `name` must be a valid C identifier.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(report_code(
                ErrorCode::InvalidKernelName,
                format!("`{name}` is not a valid kernel identifier"),
                None,
            ));
        }
        Ok(KernelSource { name, resources: Vec::new(), body: Vec::new() })
    }

    /// Runs the functor's body against a fresh source named `F::NAME`.
    pub fn generate<F: KernelFunctor>(functor: &F) -> Result<Self> {
        let mut src = KernelSource::new(F::NAME)?;
        functor.define(&mut src)?;
        log::trace!("generated kernel `{}`:\n{}", src.name, src.text());
        Ok(src)
    }

    /// Same as [`generate`](Self::generate) for a closure body.
    pub fn generate_with<B>(name: &str, body: B) -> Result<Self>
    where
        B: FnOnce(&mut KernelSource) -> Result<()>,
    {
        let mut src = KernelSource::new(name)?;
        body(&mut src)?;
        Ok(src)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a resource once and returns its parameter index.
    pub(crate) fn register(&mut self, resource: Resource) -> u32 {
        if let Some(pos) = self.resources.iter().position(|r| r.id == resource.id) {
            return pos as u32;
        }
        self.resources.push(resource);
        (self.resources.len() - 1) as u32
    }

    /// Appends a raw statement to the body.
    pub fn statement(&mut self, line: impl Into<String>) {
        self.body.push(line.into());
    }

    /// Parameter names in parameter order.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.name.as_str())
    }

    pub(crate) fn bindings(&self) -> impl Iterator<Item = (u32, &ArgBinding)> {
        self.resources.iter().enumerate().map(|(i, r)| (i as u32, &r.binding))
    }

    /// Full kernel source text.
    pub fn text(&self) -> String {
        let params: Vec<&str> = self.resources.iter().map(|r| r.decl.as_str()).collect();
        let mut out = format!("__kernel void {}({}) {{\n", self.name, params.join(", "));
        for line in &self.body {
            out.push('\t');
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }

    /// Source text with every parameter renamed to its position, so kernels
    /// that differ only in which buffers they touch share one key.
    pub(crate) fn cache_key(&self) -> String {
        let text = self.text();
        let mut key = String::with_capacity(text.len());
        let mut rest = text.as_str();
        while let Some(start) = rest.find(is_ident_char) {
            key.push_str(&rest[..start]);
            rest = &rest[start..];
            let end = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
            let word = &rest[..end];
            match self.resources.iter().position(|r| r.name == word) {
                Some(index) => key.push_str(&format!("_sycl_arg{index}")),
                None => key.push_str(word),
            }
            rest = &rest[end..];
        }
        key.push_str(rest);
        key
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(is_ident_char)
}

/// Index expression inside generated source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexExpr(String);

impl IndexExpr {
    /// Wraps arbitrary expression text.
    pub fn raw(expr: impl Into<String>) -> Self {
        IndexExpr(expr.into())
    }

    /// The work-item's global id in dimension `dim`.
    pub fn global_id(dim: u32) -> Self {
        IndexExpr(format!("get_global_id({dim})"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of a plain non-negative integer expression.
    pub(crate) fn literal(&self) -> Option<usize> {
        self.0.trim().parse().ok()
    }

    pub(crate) fn offset_by(self, offset: usize) -> Self {
        if offset == 0 {
            self
        } else {
            IndexExpr(format!("{offset} + {}", self.0))
        }
    }
}

impl From<usize> for IndexExpr {
    fn from(i: usize) -> Self {
        IndexExpr(i.to_string())
    }
}

impl From<u32> for IndexExpr {
    fn from(i: u32) -> Self {
        IndexExpr(i.to_string())
    }
}

impl From<i32> for IndexExpr {
    fn from(i: i32) -> Self {
        IndexExpr(i.to_string())
    }
}

impl fmt::Display for IndexExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Symbolic element of an accessor, e.g. `_sycl_buf3[get_global_id(0)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    expr: String,
    atomic: bool,
}

impl ElementRef {
    pub(crate) fn new(expr: String, atomic: bool) -> Self {
        ElementRef { expr, atomic }
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Emits a store; atomic elements use `atomic_xchg`.
    pub fn assign(&self, src: &mut KernelSource, value: impl fmt::Display) {
        if self.atomic {
            src.statement(format!("atomic_xchg(&{}, {value});", self.expr));
        } else {
            src.statement(format!("{} = {value};", self.expr));
        }
    }

    /// Emits `atomic_add`; only atomic accessors hand out elements that allow it.
    pub fn fetch_add(&self, src: &mut KernelSource, value: impl fmt::Display) -> Result<()> {
        if !self.atomic {
            return Err(report_code(
                ErrorCode::UnsupportedOperation,
                format!("fetch_add on non-atomic element {}", self.expr),
                None,
            ));
        }
        src.statement(format!("atomic_add(&{}, {value});", self.expr));
        Ok(())
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}
