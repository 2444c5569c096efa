use roster_types::player::Player;

use crate::models as db_models;

impl From<db_models::Player> for Player {
    fn from(p: db_models::Player) -> Self {
        Player {
            id: p.id,
            version: p.version,
            email: p.email,
            name: p.name,
            updated_at: p.updated_at,
            created_at: p.created_at,
        }
    }
}
