use racewire_protocol::PlayerEntity;

/// Players still racing, in the order they were entered.
///
/// Ids are unique. Rosters are small (one server's worth of players), so
/// lookups are linear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    players: Vec<PlayerEntity>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player. Returns `false` (and keeps the existing entry) if
    /// the id is already present.
    pub fn insert(&mut self, player: PlayerEntity) -> bool {
        if self.contains(player.id) {
            return false;
        }
        self.players.push(player);
        true
    }

    pub fn remove(&mut self, id: u32) -> Option<PlayerEntity> {
        let index = self.players.iter().position(|p| p.id == id)?;
        Some(self.players.remove(index))
    }

    pub fn contains(&self, id: u32) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: u32) -> Option<&PlayerEntity> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Empties the roster, yielding players in entry order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, PlayerEntity> {
        self.players.drain(..)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlayerEntity> {
        self.players.iter()
    }
}
