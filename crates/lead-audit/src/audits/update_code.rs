use rand::Rng;

use super::domain::UpdateCode;
use super::repository::StoreError;

pub const MAX_ATTEMPTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum UpdateCodeError {
    #[error("unable to allocate a unique update code after {0} attempts")]
    Exhausted(usize),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Draw random codes until `in_use` reports a free one, giving up after [`MAX_ATTEMPTS`].
pub fn allocate_update_code<G, F>(
    rng: &mut G,
    mut in_use: F,
) -> Result<UpdateCode, UpdateCodeError>
where
    G: Rng,
    F: FnMut(&UpdateCode) -> Result<bool, StoreError>,
{
    for _ in 0..MAX_ATTEMPTS {
        let Some(candidate) = random_code(rng) else {
            continue;
        };
        if !in_use(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(UpdateCodeError::Exhausted(MAX_ATTEMPTS))
}

fn random_code<G: Rng>(rng: &mut G) -> Option<UpdateCode> {
    UpdateCode::from_number(rng.random_range(UpdateCode::MIN..=UpdateCode::MAX))
}
