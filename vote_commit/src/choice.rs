use std::fmt;

/// Opaque election or candidate identifier, as handed over by the client.
///
/// Integers and strings are kept distinct: `7` and `"7"` are different identifiers and commit
/// to different digests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum Identifier {
    Int(u64),
    Str(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Identifier::Int(id) => write!(f, "{}", id),
            Identifier::Str(id) => write!(f, "{}", id),
        }
    }
}

impl From<u64> for Identifier {
    fn from(id: u64) -> Self {
        Identifier::Int(id)
    }
}

impl From<u32> for Identifier {
    fn from(id: u32) -> Self {
        Identifier::Int(id.into())
    }
}

impl From<String> for Identifier {
    fn from(id: String) -> Self {
        Identifier::Str(id)
    }
}

impl From<&str> for Identifier {
    fn from(id: &str) -> Self {
        Identifier::Str(id.to_owned())
    }
}

/// A voter's choice of one candidate in one election.
///
/// Neither identifier is checked against the election; the server does that.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct VoteChoice {
    election_id: Identifier,
    candidate_id: Identifier,
}

impl VoteChoice {
    pub fn new(election_id: impl Into<Identifier>, candidate_id: impl Into<Identifier>) -> Self {
        VoteChoice {
            election_id: election_id.into(),
            candidate_id: candidate_id.into(),
        }
    }

    pub fn election_id(&self) -> &Identifier {
        &self.election_id
    }

    pub fn candidate_id(&self) -> &Identifier {
        &self.candidate_id
    }
}

// The candidate is the secret half of the choice; keep it out of logs.
impl fmt::Debug for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VoteChoice")
            .field("election_id", &self.election_id)
            .field("candidate_id", &"<redacted>")
            .finish()
    }
}
