use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

use mapverify_classfile::access::*;
use mapverify_classfile::{parse_field_descriptor, parse_method_descriptor, ClassFile, Insn};
use thiserror::Error;

use crate::bridge::{lambda_target, match_bouncer, BounceTarget};

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn idx(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_usize(index: usize) -> Self {
                Self(index as u32)
            }
        }
    };
}

arena_id!(ClassId);
arena_id!(MethodId);
arena_id!(FieldId);

/// Lifecycle of a [`ClassRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassState {
    /// Referenced but never ingested.
    Stub,
    Read,
    /// Only observed while `resolve_all` is running; seeing it on entry means a cycle.
    Resolving,
    Resolved,
}

/// Ingest-time validation failures. The offending class is not inserted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralFault {
    #[error("class {0} lists itself as a supertype")]
    SelfInheritance(String),
    #[error("invalid descriptor `{descriptor}` on {class}.{member}")]
    InvalidDescriptor {
        class: String,
        member: String,
        descriptor: String,
    },
    #[error("class {0} was already read")]
    DuplicateClass(String),
}

#[derive(Debug)]
pub struct ClassRecord {
    name: String,
    access: u16,
    owned: bool,
    read: bool,
    pub(crate) state: ClassState,
    parent: Option<ClassId>,
    interfaces: Vec<ClassId>,
    fields: BTreeMap<String, FieldId>,
    /// Keyed by `name + descriptor`.
    methods: BTreeMap<String, MethodId>,
    pub(crate) stack: OnceLock<Vec<ClassId>>,
}

impl ClassRecord {
    fn stub(name: &str) -> Self {
        Self {
            name: name.to_string(),
            access: 0,
            owned: false,
            read: false,
            state: ClassState::Stub,
            parent: None,
            interfaces: Vec::new(),
            fields: BTreeMap::new(),
            methods: BTreeMap::new(),
            stack: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn access(&self) -> u16 {
        self.access
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub fn state(&self) -> ClassState {
        self.state
    }

    /// `false` for stubs, even after resolution.
    pub fn was_read(&self) -> bool {
        self.read
    }

    pub fn is_interface(&self) -> bool {
        self.access & ACC_INTERFACE != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access & ACC_ABSTRACT != 0
    }

    pub fn is_enum(&self) -> bool {
        self.access & ACC_ENUM != 0
    }

    pub fn parent(&self) -> Option<ClassId> {
        self.parent
    }

    pub fn interfaces(&self) -> &[ClassId] {
        &self.interfaces
    }

    /// Fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.fields.values().copied()
    }

    /// Methods in `name + descriptor` order.
    pub fn methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.methods.values().copied()
    }
}

#[derive(Debug)]
pub struct FieldRecord {
    owner: ClassId,
    name: String,
    descriptor: String,
    access: u16,
}

impl FieldRecord {
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn access(&self) -> u16 {
        self.access
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.access)
    }

    pub fn is_static(&self) -> bool {
        self.access & ACC_STATIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.access & ACC_PRIVATE != 0
    }
}

#[derive(Debug)]
pub struct MethodRecord {
    owner: ClassId,
    name: String,
    descriptor: String,
    access: u16,
    lambda: bool,
    bounce: Option<BounceTarget>,
    code: Option<Vec<Insn>>,
    pub(crate) overrides: BTreeSet<MethodId>,
    pub(crate) roots: OnceLock<Vec<MethodId>>,
}

impl MethodRecord {
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn access(&self) -> u16 {
        self.access
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.access)
    }

    pub(crate) fn key(&self) -> String {
        method_key(&self.name, &self.descriptor)
    }

    pub fn is_static(&self) -> bool {
        self.access & ACC_STATIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.access & ACC_PRIVATE != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access & ACC_ABSTRACT != 0
    }

    /// `<init>` or `<clinit>`.
    pub fn is_initializer(&self) -> bool {
        self.name.starts_with('<')
    }

    /// Target of a lambda `invokedynamic` in its own class.
    pub fn is_lambda(&self) -> bool {
        self.lambda
    }

    /// Whether this method takes part in virtual dispatch (can override something).
    pub fn can_override(&self) -> bool {
        !self.is_initializer() && self.access & (ACC_PRIVATE | ACC_STATIC) == 0
    }

    /// Whether a subclass method with the same name and descriptor overrides this one.
    pub fn can_be_overridden(&self) -> bool {
        self.can_override() && self.access & ACC_FINAL == 0
    }

    pub fn bounce(&self) -> Option<&BounceTarget> {
        self.bounce.as_ref()
    }

    /// Decoded body; retained for owned classes only.
    pub fn code(&self) -> Option<&[Insn]> {
        self.code.as_deref()
    }
}

pub(crate) fn method_key(name: &str, descriptor: &str) -> String {
    let mut key = String::with_capacity(name.len() + descriptor.len());
    key.push_str(name);
    key.push_str(descriptor);
    key
}

/// Arena of every class seen during a run, ingested or merely referenced.
#[derive(Debug, Default)]
pub struct ClassDirectory {
    pub(crate) classes: Vec<ClassRecord>,
    pub(crate) methods: Vec<MethodRecord>,
    fields: Vec<FieldRecord>,
    by_name: HashMap<String, ClassId>,
    owned: BTreeMap<String, ClassId>,
    pub(crate) bridge_targets: HashMap<MethodId, MethodId>,
    pub(crate) bridges_to: HashMap<MethodId, Vec<MethodId>>,
}

impl ClassDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, name: &str) -> ClassId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = ClassId::from_usize(self.classes.len());
        self.classes.push(ClassRecord::stub(name));
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn class(&self, id: ClassId) -> &ClassRecord {
        &self.classes[id.idx()]
    }

    pub fn method(&self, id: MethodId) -> &MethodRecord {
        &self.methods[id.idx()]
    }

    pub fn field(&self, id: FieldId) -> &FieldRecord {
        &self.fields[id.idx()]
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Every class, stubs included, in creation order.
    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.classes.len()).map(ClassId::from_usize)
    }

    /// Classes under test, sorted by name.
    pub fn owned(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.owned.values().copied()
    }

    pub fn find_method(&self, class: ClassId, name: &str, descriptor: &str) -> Option<MethodId> {
        self.method_by_key(class, &method_key(name, descriptor))
    }

    pub(crate) fn method_by_key(&self, class: ClassId, key: &str) -> Option<MethodId> {
        self.classes[class.idx()].methods.get(key).copied()
    }

    pub fn find_field(&self, class: ClassId, name: &str) -> Option<FieldId> {
        self.classes[class.idx()].fields.get(name).copied()
    }

    /// `owner.name+descriptor`, for diagnostics.
    pub fn describe_method(&self, id: MethodId) -> String {
        let m = self.method(id);
        format!("{}.{}{}", self.class(m.owner).name, m.name, m.descriptor)
    }

    /// Orders methods by owner name, then name, then descriptor.
    pub fn compare_methods(&self, a: MethodId, b: MethodId) -> std::cmp::Ordering {
        let (ma, mb) = (self.method(a), self.method(b));
        self.class(ma.owner)
            .name
            .cmp(&self.class(mb.owner).name)
            .then_with(|| ma.name.cmp(&mb.name))
            .then_with(|| ma.descriptor.cmp(&mb.descriptor))
    }

    /// Populates the record for `class`. Body instructions are kept only when `owned`.
    pub fn ingest(&mut self, class: ClassFile, owned: bool) -> Result<ClassId, StructuralFault> {
        let name = class.this_class;
        if let Some(id) = self.lookup(&name) {
            if self.classes[id.idx()].was_read() {
                return Err(StructuralFault::DuplicateClass(name));
            }
        }
        if class.super_class.as_deref() == Some(name.as_str())
            || class.interfaces.iter().any(|i| *i == name)
        {
            return Err(StructuralFault::SelfInheritance(name));
        }
        for field in &class.fields {
            if parse_field_descriptor(&field.descriptor).is_err() {
                return Err(invalid_descriptor(&name, &field.name, &field.descriptor));
            }
        }
        for method in &class.methods {
            if parse_method_descriptor(&method.descriptor).is_err() {
                return Err(invalid_descriptor(&name, &method.name, &method.descriptor));
            }
        }

        let lambdas: HashSet<String> = class
            .methods
            .iter()
            .filter_map(|m| m.code.as_ref())
            .flat_map(|code| code.instructions.iter())
            .filter_map(|insn| match insn {
                Insn::InvokeDynamic(indy) => lambda_target(indy),
                _ => None,
            })
            .filter(|handle| handle.owner == name)
            .map(|handle| method_key(&handle.name, &handle.descriptor))
            .collect();

        let id = self.get_or_create(&name);
        let parent = class.super_class.as_deref().map(|s| self.get_or_create(s));
        let interfaces: Vec<ClassId> = class
            .interfaces
            .iter()
            .map(|i| self.get_or_create(i))
            .collect();

        let mut fields = BTreeMap::new();
        for field in class.fields {
            let fid = FieldId::from_usize(self.fields.len());
            if fields.contains_key(&field.name) {
                continue;
            }
            fields.insert(field.name.clone(), fid);
            self.fields.push(FieldRecord {
                owner: id,
                name: field.name,
                descriptor: field.descriptor,
                access: field.access_flags,
            });
        }

        let mut methods = BTreeMap::new();
        for method in class.methods {
            let key = method_key(&method.name, &method.descriptor);
            if methods.contains_key(&key) {
                continue;
            }
            let lambda = lambdas.contains(&key);
            let instructions = method.code.map(|c| c.instructions);
            let bounce = instructions.as_deref().and_then(|code| {
                match_bouncer(method.access_flags, &method.descriptor, code, lambda)
            });
            let mid = MethodId::from_usize(self.methods.len());
            methods.insert(key, mid);
            self.methods.push(MethodRecord {
                owner: id,
                name: method.name,
                descriptor: method.descriptor,
                access: method.access_flags,
                lambda,
                bounce,
                code: if owned { instructions } else { None },
                overrides: Default::default(),
                roots: OnceLock::new(),
            });
        }

        let record = &mut self.classes[id.idx()];
        record.access = class.access_flags;
        record.owned = owned;
        record.read = true;
        record.state = ClassState::Read;
        record.parent = parent;
        record.interfaces = interfaces;
        record.fields = fields;
        record.methods = methods;
        if owned {
            self.owned.insert(name.clone(), id);
        }
        tracing::debug!(class = %name, owned, "ingested class");
        Ok(id)
    }

    /// Every ancestor of `class` exactly once, the class itself excluded: the superclass and
    /// declared interfaces first, then their supertypes, breadth-first.
    pub fn stack(&self, class: ClassId) -> &[ClassId] {
        self.classes[class.idx()].stack.get_or_init(|| {
            let mut out = Vec::new();
            let mut seen = HashSet::from([class]);
            let mut queue = VecDeque::new();
            let mut push = |id: ClassId, queue: &mut VecDeque<ClassId>| {
                if seen.insert(id) {
                    queue.push_back(id);
                }
            };
            let record = &self.classes[class.idx()];
            for &s in record.parent.iter().chain(&record.interfaces) {
                push(s, &mut queue);
            }
            while let Some(next) = queue.pop_front() {
                out.push(next);
                let record = &self.classes[next.idx()];
                for &s in record.parent.iter().chain(&record.interfaces) {
                    push(s, &mut queue);
                }
            }
            out
        })
    }

    /// `true` when `ancestor` is `class` or in its stack.
    pub fn is_subclass_of(&self, class: ClassId, ancestor: ClassId) -> bool {
        class == ancestor || self.stack(class).contains(&ancestor)
    }
}

fn invalid_descriptor(class: &str, member: &str, descriptor: &str) -> StructuralFault {
    StructuralFault::InvalidDescriptor {
        class: class.to_string(),
        member: member.to_string(),
        descriptor: descriptor.to_string(),
    }
}
