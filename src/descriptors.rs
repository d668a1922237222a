//! Parameter descriptors and signatures.
//!
//! Rust has no runtime reflection over closures, so every callable carries an
//! explicit [`Signature`] built next to it. Rules match against the [`Param`]s
//! of that signature.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{IncantError, IncantResult};
use crate::key::{type_key, TypeKey};
use crate::value::{value, Value};

/// How a parameter may be supplied by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// By position or by keyword
    Positional,
    /// By keyword only
    KeywordOnly,
}

/// Static description of one formal parameter of a callable.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{Param, ParamKind, type_key};
///
/// let p = Param::new("port").typed::<u16>().default_value(8080u16);
/// assert_eq!(p.name(), "port");
/// assert_eq!(p.declared_type(), Some(type_key::<u16>()));
/// assert!(p.has_default());
/// assert_eq!(p.kind(), ParamKind::Positional);
/// ```
#[derive(Clone)]
pub struct Param {
    name: Cow<'static, str>,
    kind: ParamKind,
    ty: Option<TypeKey>,
    default: Option<Value>,
}

impl Param {
    /// An untyped positional parameter with no default.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Positional,
            ty: None,
            default: None,
        }
    }

    /// Declares the parameter's type.
    pub fn typed<T: ?Sized + 'static>(mut self) -> Self {
        self.ty = Some(type_key::<T>());
        self
    }

    /// Declares the parameter's type from a token.
    pub fn with_type(mut self, ty: Option<TypeKey>) -> Self {
        self.ty = ty;
        self
    }

    /// Makes the parameter keyword-only.
    pub fn keyword_only(mut self) -> Self {
        self.kind = ParamKind::KeywordOnly;
        self
    }

    /// Gives the parameter a default value.
    pub fn default_value<T: std::any::Any + Send + Sync>(mut self, default: T) -> Self {
        self.default = Some(value(default));
        self
    }

    /// Gives the parameter an already-erased default value.
    pub fn with_default(mut self, default: Option<Value>) -> Self {
        self.default = default;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn declared_type(&self) -> Option<TypeKey> {
        self.ty
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_keyword_only(&self) -> bool {
        self.kind == ParamKind::KeywordOnly
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("ty", &self.ty)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// Ordered parameter list plus an optional declared return type.
///
/// Cloning is cheap; the parameter list is shared.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{Signature, Param, CallArgs, ValueExt};
///
/// let sig = Signature::new()
///     .param(Param::new("a").typed::<i64>())
///     .param(Param::new("b").typed::<i64>().default_value(7i64))
///     .returns::<i64>();
///
/// let bound = sig.bind(CallArgs::new().arg(1i64)).unwrap();
/// assert_eq!(bound[1].get::<i64>().unwrap(), 7);
///
/// let bound = sig.bind(CallArgs::new().arg(1i64).kwarg("b", 5i64)).unwrap();
/// assert_eq!(bound[1].get::<i64>().unwrap(), 5);
///
/// assert!(sig.bind(CallArgs::new()).is_err());
/// ```
#[derive(Clone)]
pub struct Signature {
    params: Arc<[Param]>,
    returns: Option<TypeKey>,
}

impl Signature {
    /// An empty signature with no return type.
    pub fn new() -> Self {
        Signature {
            params: Arc::from(Vec::new()),
            returns: None,
        }
    }

    /// Builds a signature from parameters and a return type.
    pub fn from_params(params: Vec<Param>, returns: Option<TypeKey>) -> Self {
        Signature {
            params: Arc::from(params),
            returns,
        }
    }

    /// Appends a parameter.
    pub fn param(self, param: Param) -> Self {
        let mut params = self.params.to_vec();
        params.push(param);
        Signature {
            params: Arc::from(params),
            returns: self.returns,
        }
    }

    /// Declares the return type.
    pub fn returns<T: ?Sized + 'static>(mut self) -> Self {
        self.returns = Some(type_key::<T>());
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn return_type(&self) -> Option<TypeKey> {
        self.returns
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Position of the parameter called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name() == name)
    }

    /// Binds caller-supplied arguments to this signature.
    ///
    /// Positional values fill non-keyword-only parameters in order, keyword
    /// values fill parameters by name, and defaults fill whatever is left.
    /// Returns one value per parameter, in declaration order.
    pub fn bind(&self, args: CallArgs) -> IncantResult<Vec<Value>> {
        let mut slots: Vec<Option<Value>> = vec![None; self.params.len()];

        let positional_slots: Vec<usize> = self
            .params
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_keyword_only())
            .map(|(ix, _)| ix)
            .collect();
        if args.positional.len() > positional_slots.len() {
            return Err(IncantError::TooManyPositional {
                expected: positional_slots.len(),
                given: args.positional.len(),
            });
        }
        for (slot, v) in positional_slots.into_iter().zip(args.positional) {
            slots[slot] = Some(v);
        }

        for (name, v) in args.keyword {
            let ix = self
                .position(&name)
                .ok_or_else(|| IncantError::UnexpectedArgument(name.clone()))?;
            if slots[ix].is_some() {
                return Err(IncantError::MultipleValues(name));
            }
            slots[ix] = Some(v);
        }

        slots
            .into_iter()
            .zip(self.params.iter())
            .map(|(slot, param)| match slot {
                Some(v) => Ok(v),
                None => param
                    .default
                    .clone()
                    .ok_or_else(|| IncantError::MissingArgument(param.name().to_string())),
            })
            .collect()
    }
}

impl Default for Signature {
    fn default() -> Self {
        Signature::new()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("params", &self.params)
            .field("returns", &self.returns)
            .finish()
    }
}

/// Arguments supplied by a caller: positional values then keyword values.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::CallArgs;
///
/// let args = CallArgs::new().arg(1i32).kwarg("name", "x".to_string());
/// assert_eq!(args.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct CallArgs {
    pub(crate) positional: Vec<Value>,
    pub(crate) keyword: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional value.
    pub fn arg<T: std::any::Any + Send + Sync>(self, v: T) -> Self {
        self.arg_value(value(v))
    }

    /// Appends an already-erased positional value.
    pub fn arg_value(mut self, v: Value) -> Self {
        self.positional.push(v);
        self
    }

    /// Adds a keyword value.
    pub fn kwarg<T: std::any::Any + Send + Sync>(self, name: impl Into<String>, v: T) -> Self {
        self.kwarg_value(name, value(v))
    }

    /// Adds an already-erased keyword value.
    pub fn kwarg_value(mut self, name: impl Into<String>, v: Value) -> Self {
        self.keyword.push((name.into(), v));
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CallArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallArgs")
            .field("positional", &self.positional.len())
            .field("keyword", &self.keyword.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}
