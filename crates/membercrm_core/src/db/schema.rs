//! Static description of every collection and its secondary indices.
//!
//! Index names double as the JSON key path inside the stored document, so
//! `users.email` is backed by `json_extract(doc, '$.email')`. Only names
//! listed here are ever interpolated into SQL.

/// One secondary index over a top-level document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    pub name: &'static str,
    pub unique: bool,
}

/// One named collection (SQLite table) of JSON documents keyed by `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionDef {
    pub name: &'static str,
    pub indices: &'static [IndexDef],
}

impl CollectionDef {
    pub fn index(&self, name: &str) -> Option<&'static IndexDef> {
        self.indices.iter().find(|index| index.name == name)
    }

    /// SQL expression that reads the indexed field; must match the index DDL.
    pub(crate) fn index_expr(index: &IndexDef) -> String {
        format!("json_extract(doc, '$.{}')", index.name)
    }
}

const fn index(name: &'static str) -> IndexDef {
    IndexDef {
        name,
        unique: false,
    }
}

const fn unique(name: &'static str) -> IndexDef {
    IndexDef { name, unique: true }
}

pub const USERS: CollectionDef = CollectionDef {
    name: "users",
    indices: &[unique("email"), index("status")],
};

pub const MEMBERS: CollectionDef = CollectionDef {
    name: "members",
    indices: &[unique("idNumber"), index("memberType"), index("status")],
};

pub const CONTRACTS: CollectionDef = CollectionDef {
    name: "contracts",
    indices: &[index("memberId"), index("status")],
};

pub const RELATIONS: CollectionDef = CollectionDef {
    name: "relations",
    indices: &[index("memberId"), index("relatedMemberId")],
};

pub const CHANGELOG: CollectionDef = CollectionDef {
    name: "changelog",
    indices: &[index("entityType"), index("entityId")],
};

pub const SETTINGS: CollectionDef = CollectionDef {
    name: "settings",
    indices: &[unique("key")],
};

/// Every declared collection, in export order.
pub const COLLECTIONS: &[CollectionDef] = &[USERS, MEMBERS, CONTRACTS, RELATIONS, CHANGELOG, SETTINGS];

pub fn collection(name: &str) -> Option<&'static CollectionDef> {
    COLLECTIONS.iter().find(|def| def.name == name)
}
