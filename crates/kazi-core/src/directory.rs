use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::ids::{ActorId, DepartmentId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Intern,
    Officer,
    Supervisor,
    Director,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Intern => "intern",
            Self::Officer => "officer",
            Self::Supervisor => "supervisor",
            Self::Director => "director",
            Self::Admin => "admin",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intern" => Ok(Self::Intern),
            "officer" => Ok(Self::Officer),
            "supervisor" => Ok(Self::Supervisor),
            "director" => Ok(Self::Director),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// What the identity provider tells us about an actor: role, home
/// department, and the departments they are a designated reviewer for.
#[derive(Clone, Debug)]
pub struct ActorProfile {
    pub id: ActorId,
    pub role: Role,
    pub department: Option<DepartmentId>,
    pub reviews_for: HashSet<DepartmentId>,
}

impl ActorProfile {
    pub fn new(id: ActorId, role: Role, department: Option<DepartmentId>) -> Self {
        Self {
            id,
            role,
            department,
            reviews_for: HashSet::new(),
        }
    }

    pub fn with_reviewer_of(mut self, dept: DepartmentId) -> Self {
        self.reviews_for.insert(dept);
        self
    }

    pub fn is_director(&self) -> bool {
        self.role == Role::Director
    }

    pub fn is_reviewer_of(&self, dept: &DepartmentId) -> bool {
        self.reviews_for.contains(dept)
    }
}

/// Identity/authorization provider. The engine asks for the profile of an
/// actor it already holds an ID for, or for the designated reviewers of a
/// department when routing review notifications.
pub trait Identity: Send + Sync {
    fn lookup(&self, actor: &ActorId) -> Option<ActorProfile>;

    fn reviewers_for(&self, dept: &DepartmentId) -> Vec<ActorId>;
}

/// Assignment matrix: nobody assigns work to a Director; interns can only
/// hand off to other interns (or admin); directors and admins may assign to
/// anyone below Director.
pub fn can_assign(assigner: Role, assignee: Role) -> bool {
    if assignee == Role::Director {
        return false;
    }
    match assigner {
        Role::Intern => matches!(assignee, Role::Intern | Role::Admin),
        Role::Officer | Role::Supervisor => {
            matches!(assignee, Role::Intern | Role::Officer | Role::Supervisor | Role::Admin)
        }
        Role::Director | Role::Admin => true,
    }
}

/// Soft-delete permission: the creator, or any supervisor-and-above.
pub fn can_delete(task_creator: &ActorId, actor: &ActorProfile) -> bool {
    actor.id == *task_creator
        || matches!(actor.role, Role::Supervisor | Role::Director | Role::Admin)
}
