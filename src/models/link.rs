use std::future::Future;

/// Résultat de la résolution d'une référence faible (pharmacist_id, group_id).
///
/// Une erreur de lecture du store n'est PAS un `Unresolved` : elle remonte
/// dans le `Err` de [`resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Link<T> {
    /// Aucune référence enregistrée
    NotLinked,
    /// Référence présente mais aucun enregistrement correspondant
    Unresolved(i32),
    Resolved(T),
}

impl<T> Link<T> {
    pub fn resolved(&self) -> Option<&T> {
        match self {
            Link::Resolved(value) => Some(value),
            _ => None,
        }
    }
}

/// Résout une référence optionnelle avec la fonction de lecture fournie
pub async fn resolve<T, E, F, Fut>(id: Option<i32>, fetch: F) -> Result<Link<T>, E>
where
    F: FnOnce(i32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let Some(id) = id else {
        return Ok(Link::NotLinked);
    };

    Ok(match fetch(id).await? {
        Some(value) => Link::Resolved(value),
        None => Link::Unresolved(id),
    })
}
