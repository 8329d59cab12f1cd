//! Image objects and the object store.
//!
//! An [`ImageObject`] places an [`ImageData`] on the canvas: position, clip,
//! visibility and a pending magnification. Object 0 is the implicit target
//! of images outside any DEFI; it lives beside the store and is never freed.
//! Every other object sits in an id-ordered list.

use super::data::{GlobalDefaults, ImageData, ImageHeader, ImageRef};
use super::magnify::{magnify, Magnification};
use crate::util::{Error, Point, Rect, Result};

/// Where a moved or cloned object lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Absolute(Point),
    /// Offset from the current (or source) position.
    Relative(Point),
}

impl Location {
    /// Location from an MNG delta-type byte (0 absolute, else relative).
    pub const fn from_type(kind: u8, x: i32, y: i32) -> Self {
        if kind == 0 { Self::Absolute(Point::new(x, y)) } else { Self::Relative(Point::new(x, y)) }
    }

    #[inline]
    pub const fn apply(self, base: Point) -> Point {
        match self {
            Self::Absolute(p) => p,
            Self::Relative(d) => base.offset(d.x, d.y),
        }
    }
}

/// CLON types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloneKind {
    /// Deep copy of the pixels.
    Full,
    /// Shares the source's buffer.
    Partial,
    /// Moves the source to the new id.
    Renumber,
}

impl CloneKind {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Full),
            1 => Some(Self::Partial),
            2 => Some(Self::Renumber),
            _ => None,
        }
    }
}

/// DEFI parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectDef {
    pub visible: bool,
    pub concrete: bool,
    pub position: Point,
    pub clip: Option<Rect>,
}

impl Default for ObjectDef {
    fn default() -> Self {
        Self { visible: true, concrete: false, position: Point::default(), clip: None }
    }
}

/// An image placed on the canvas.
#[derive(Clone, Debug)]
pub struct ImageObject {
    pub id: u16,
    pub data: ImageRef,
    pub frozen: bool,
    pub visible: bool,
    pub viewable: bool,
    pub valid: bool,
    pub position: Point,
    pub clipped: bool,
    pub clip: Rect,
    /// Applied lazily by [`ObjectStore::resolve`].
    pub magnify: Option<Magnification>,
    /// Previous PAST target on this object.
    pub paste_origin: Point,
}

impl ImageObject {
    pub fn new(id: u16, data: ImageData) -> Self {
        let viewable = data.viewable;
        Self {
            id,
            data: ImageRef::new(data),
            frozen: false,
            visible: true,
            viewable,
            valid: true,
            position: Point::default(),
            clipped: false,
            clip: Rect::unbounded(),
            magnify: None,
            paste_origin: Point::default(),
        }
    }

    /// Object 0 with an empty buffer.
    pub fn zero() -> Self {
        let mut obj = Self::new(0, ImageData::empty());
        obj.viewable = true;
        obj
    }

    /// Canvas area covered by this object after clipping.
    pub fn bounds(&self) -> Rect {
        let area = Rect::from_size(self.position, self.data.width(), self.data.height());
        if self.clipped { area.intersect(&self.clip) } else { area }
    }

    /// Mutable pixel access, refusing frozen objects.
    pub fn data_mut(&mut self) -> Result<&mut ImageData> {
        if self.frozen {
            return Err(Error::ObjectFrozen(self.id));
        }
        Ok(self.data.make_mut())
    }

    /// Apply the pending magnification.
    pub fn resolve(&mut self) -> Result<()> {
        if let Some(mag) = self.magnify.take() {
            if !mag.is_noop() {
                let out = magnify(&self.data, &mag, self.id == 0)?;
                tracing::debug!(id = self.id, width = out.width(), height = out.height(), "magnified");
                self.data.replace(out);
            }
        }
        Ok(())
    }

    /// Reformat the buffer for a new image header.
    ///
    /// An unclipped object is clipped to the image; object 0 keeps its
    /// pending magnification.
    pub fn reset_details(&mut self, header: ImageHeader, reset_all: bool, globals: &GlobalDefaults) -> Result<()> {
        let id = self.id;
        let data = self.data_mut()?;
        data.reset_details(header, reset_all, globals);
        data.viewable = true;
        self.viewable = true;
        if reset_all {
            self.paste_origin = Point::default();
        }
        if !self.clipped && header.width > 0 && header.height > 0 {
            self.clip = Rect::from_size(Point::default(), header.width, header.height);
        }
        if id != 0 {
            self.magnify = None;
        }
        Ok(())
    }
}

// ============================================================================
// Store
// ============================================================================

/// Object 0 plus the id-ordered objects 1..=65535.
#[derive(Debug)]
pub struct ObjectStore {
    zero: ImageObject,
    objects: Vec<ImageObject>,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore {
    pub fn new() -> Self {
        Self { zero: ImageObject::zero(), objects: Vec::new() }
    }

    #[inline]
    pub fn zero(&self) -> &ImageObject {
        &self.zero
    }

    #[inline]
    pub fn zero_mut(&mut self) -> &mut ImageObject {
        &mut self.zero
    }

    /// Number of non-zero objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn index_of(&self, id: u16) -> std::result::Result<usize, usize> {
        self.objects.binary_search_by_key(&id, |o| o.id)
    }

    pub fn get(&self, id: u16) -> Option<&ImageObject> {
        if id == 0 {
            return Some(&self.zero);
        }
        self.index_of(id).ok().map(|i| &self.objects[i])
    }

    pub fn get_mut(&mut self, id: u16) -> Option<&mut ImageObject> {
        if id == 0 {
            return Some(&mut self.zero);
        }
        match self.index_of(id) {
            Ok(i) => Some(&mut self.objects[i]),
            Err(_) => None,
        }
    }

    fn require_mut(&mut self, id: u16) -> Result<&mut ImageObject> {
        self.get_mut(id).ok_or(Error::ObjectNotFound(id))
    }

    #[inline]
    pub fn contains(&self, id: u16) -> bool {
        self.get(id).is_some()
    }

    /// Insert keeping id order; ids mostly arrive ascending, so scan from
    /// the tail.
    fn insert(&mut self, obj: ImageObject) -> &mut ImageObject {
        let mut at = self.objects.len();
        while at > 0 && self.objects[at - 1].id > obj.id {
            at -= 1;
        }
        self.objects.insert(at, obj);
        &mut self.objects[at]
    }

    /// Define object `id` (DEFI). An existing object keeps its buffer.
    pub fn define(&mut self, id: u16, def: &ObjectDef) -> Result<&mut ImageObject> {
        if id != 0 && !self.contains(id) {
            let mut data = ImageData::empty();
            data.concrete = def.concrete;
            self.insert(ImageObject::new(id, data));
        }
        let obj = self.require_mut(id)?;
        if obj.frozen {
            return Err(Error::ObjectFrozen(id));
        }
        obj.visible = def.visible;
        obj.position = def.position;
        obj.clipped = def.clip.is_some();
        obj.clip = def.clip.unwrap_or_else(Rect::unbounded);
        if obj.data.concrete != def.concrete {
            obj.data.make_mut().concrete = def.concrete;
        }
        tracing::debug!(id, visible = def.visible, concrete = def.concrete, "define object");
        Ok(obj)
    }

    /// Reformat `id` for a new image, creating it when needed.
    pub fn reset_object(
        &mut self,
        id: u16,
        header: ImageHeader,
        reset_all: bool,
        globals: &GlobalDefaults,
    ) -> Result<&mut ImageObject> {
        if !self.contains(id) {
            self.insert(ImageObject::new(id, ImageData::empty()));
        }
        let obj = self.require_mut(id)?;
        obj.reset_details(header, reset_all, globals)?;
        obj.valid = true;
        Ok(obj)
    }

    /// Clone `source` into `target` (CLON).
    ///
    /// The source's pending magnification is applied first. Without a
    /// location the clone takes the source position.
    pub fn clone_object(
        &mut self,
        source: u16,
        target: u16,
        kind: CloneKind,
        visible: bool,
        abstract_: bool,
        location: Option<Location>,
    ) -> Result<&mut ImageObject> {
        if kind == CloneKind::Renumber {
            return self.renumber(source, target, visible, abstract_, location);
        }
        if self.contains(target) {
            return Err(Error::ObjectExists(target));
        }
        let src = self.require_mut(source)?;
        src.resolve()?;
        let src = &*src;

        let data = match kind {
            CloneKind::Partial => src.data.share(),
            _ => {
                let concrete = if abstract_ { false } else { src.data.concrete };
                ImageRef::new(src.data.deep_clone(concrete))
            }
        };
        let obj = ImageObject {
            id: target,
            data,
            frozen: false,
            visible,
            viewable: src.viewable,
            valid: src.valid,
            position: location.map_or(src.position, |l| l.apply(src.position)),
            clipped: src.clipped,
            clip: src.clip,
            magnify: None,
            paste_origin: Point::default(),
        };
        tracing::debug!(source, target, ?kind, "clone object");
        Ok(self.insert(obj))
    }

    /// Move object `from` to id `to`.
    pub fn renumber(
        &mut self,
        from: u16,
        to: u16,
        visible: bool,
        abstract_: bool,
        location: Option<Location>,
    ) -> Result<&mut ImageObject> {
        if from == 0 {
            return Err(Error::FunctionInvalid("object 0 cannot be renumbered"));
        }
        if self.contains(to) {
            return Err(Error::ObjectExists(to));
        }
        let at = self.index_of(from).map_err(|_| Error::ObjectNotFound(from))?;
        if self.objects[at].frozen {
            return Err(Error::ObjectFrozen(from));
        }
        let mut obj = self.objects.remove(at);
        obj.id = to;
        obj.visible = visible;
        if let Some(l) = location {
            obj.position = l.apply(obj.position);
        }
        if abstract_ && obj.data.concrete {
            obj.data.make_mut().concrete = false;
        }
        tracing::debug!(from, to, "renumber object");
        Ok(self.insert(obj))
    }

    /// Remove `id`; object 0 and frozen objects stay. Returns whether it
    /// was removed.
    pub fn free(&mut self, id: u16) -> bool {
        match self.index_of(id) {
            Ok(i) if id != 0 && !self.objects[i].frozen => {
                self.objects.remove(i);
                true
            }
            _ => false,
        }
    }

    /// DISC: drop the listed objects, or every unfrozen one for an empty list.
    pub fn discard(&mut self, ids: &[u16]) {
        if ids.is_empty() {
            self.drop_unfrozen();
        } else {
            for &id in ids {
                self.free(id);
            }
        }
    }

    pub fn drop_unfrozen(&mut self) {
        self.objects.retain(|o| o.frozen);
    }

    /// Handles on the buffer of `id`.
    pub fn refcount(&self, id: u16) -> Option<usize> {
        self.get(id).map(|o| o.data.refcount())
    }

    /// Apply the pending magnification of `id`.
    pub fn resolve(&mut self, id: u16) -> Result<()> {
        self.require_mut(id)?.resolve()
    }

    /// Object `id` with its magnification applied.
    pub fn resolved(&mut self, id: u16) -> Result<&ImageObject> {
        let obj = self.require_mut(id)?;
        obj.resolve()?;
        Ok(obj)
    }

    /// MAGN over `first..=last`.
    ///
    /// Object 0 only records the request. Other existing unfrozen objects
    /// apply any earlier request first, then record the new one.
    pub fn set_magnification(&mut self, first: u16, last: u16, mag: Magnification) -> Result<()> {
        if first == 0 {
            self.zero.magnify = Some(mag);
        }
        for obj in self.objects.iter_mut().filter(|o| o.id >= first && o.id <= last && !o.frozen) {
            obj.resolve()?;
            obj.magnify = Some(mag);
        }
        Ok(())
    }

    /// Objects with ids in `first..=last`, including object 0 when in range.
    pub fn range_mut(&mut self, first: u16, last: u16) -> impl Iterator<Item = &mut ImageObject> + '_ {
        let zero = (first == 0).then_some(&mut self.zero);
        zero.into_iter().chain(self.objects.iter_mut().filter(move |o| o.id >= first && o.id <= last))
    }

    /// Non-zero objects in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ImageObject> + '_ {
        self.objects.iter()
    }

    pub fn ids(&self) -> Vec<u16> {
        self.objects.iter().map(|o| o.id).collect()
    }

    /// SAVE: freeze every numbered object and its buffer, keeping shared
    /// buffers shared. Object 0 stays writable.
    pub fn freeze_all(&mut self) {
        let mut swapped: Vec<(ImageRef, ImageRef)> = Vec::new();
        for obj in self.objects.iter_mut() {
            obj.frozen = true;
            if obj.data.frozen {
                continue;
            }
            if !obj.data.is_shared() {
                obj.data.freeze();
                continue;
            }
            if let Some((_, frozen)) = swapped.iter().find(|(old, _)| old.ptr_eq(&obj.data)) {
                obj.data = frozen.share();
                continue;
            }
            let old = obj.data.share();
            obj.data.freeze();
            swapped.push((old, obj.data.share()));
        }
        tracing::debug!(objects = self.objects.len(), "objects frozen");
    }

    /// Drop everything and start over with an empty object 0.
    pub fn reset(&mut self) {
        self.objects.clear();
        self.zero = ImageObject::zero();
    }
}
