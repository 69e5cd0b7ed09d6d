// ============================================================================
// RÉSOLUTION DES DROITS D'ACCÈS AUX FICHES
// ============================================================================
//
// Description:
//   Décide si une fiche est visible et/ou verrouillée pour un utilisateur.
//   Fonction pure : le contexte (pharmacien lié, groupe) est chargé une fois
//   par requête par load_context, jamais par fiche.
//
// Ordre d'évaluation (la première règle qui s'applique gagne):
//   1. fiche gratuite -> déverrouillée
//   2. anonyme -> verrouillée
//   3. Admin / Formateur -> déverrouillée
//   4. calcul de l'abonné effectif (soi, pharmacien lié, pharmacien du groupe)
//   5. abonnement actif OU essai en cours de l'abonné effectif -> déverrouillée
//   6. fiche assignée au groupe -> déverrouillée
//   7. sinon verrouillée
//
// Points d'attention:
//   - Un drapeau has_active_subscription périmé (date de fin passée) est
//     traité comme inactif, même si l'auto-correction du login n'a pas tourné
//   - Une référence introuvable donne un accès plus strict, pas une erreur
//
// ============================================================================

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::enums::{FicheStatus, Role};
use crate::models::link::{self, Link};
use crate::models::{groups, memofiches, users};
use crate::store::Store;

/// Manière dont un rôle obtient (ou hérite) son abonnement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberRole {
    /// Admin, Formateur : accès complet, aucun abonnement requis
    BackOffice,
    /// Préparateur : hérite uniquement du pharmacien lié
    LinkedAssistant,
    /// Pharmacien : pharmacien lié (adjoint) puis pharmacien du groupe
    Pharmacist,
    /// Apprenant : hérite uniquement du pharmacien de son groupe
    GroupLearner,
    /// AdminWebinar et autres : son propre abonnement
    Independent,
}

impl From<Role> for SubscriberRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin | Role::Formateur => SubscriberRole::BackOffice,
            Role::Preparateur => SubscriberRole::LinkedAssistant,
            Role::Pharmacien => SubscriberRole::Pharmacist,
            Role::Apprenant => SubscriberRole::GroupLearner,
            Role::AdminWebinar => SubscriberRole::Independent,
        }
    }
}

impl SubscriberRole {
    fn inherits_from_link(self) -> bool {
        matches!(self, SubscriberRole::LinkedAssistant | SubscriberRole::Pharmacist)
    }

    fn inherits_from_group(self) -> bool {
        matches!(self, SubscriberRole::Pharmacist | SubscriberRole::GroupLearner)
    }
}

/// Enregistrements liés à l'utilisateur, chargés une fois par requête
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub pharmacist: Link<users::Model>,
    pub group: Link<groups::Model>,
    pub group_pharmacist: Link<users::Model>,
}

impl AccessContext {
    pub fn empty() -> Self {
        Self {
            pharmacist: Link::NotLinked,
            group: Link::NotLinked,
            group_pharmacist: Link::NotLinked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub visible: bool,
    pub locked: bool,
}

pub fn subscription_active(user: &users::Model, now: DateTime<Utc>) -> bool {
    user.has_active_subscription && user.subscription_end_date.is_some_and(|end| end > now)
}

pub fn trial_active(user: &users::Model, now: DateTime<Utc>) -> bool {
    user.trial_expires_at.is_some_and(|expires| expires > now)
}

/// Compte dont l'abonnement conditionne l'accès de `user`.
/// Une seule substitution : le lien direct est prioritaire sur le groupe.
pub fn effective_subscriber<'a>(user: &'a users::Model, context: &'a AccessContext) -> &'a users::Model {
    let role = SubscriberRole::from(user.role);

    if role.inherits_from_link() {
        if let Some(pharmacist) = context.pharmacist.resolved() {
            return pharmacist;
        }
    }

    if role.inherits_from_group() {
        if let Some(pharmacist) = context.group_pharmacist.resolved() {
            return pharmacist;
        }
    }

    user
}

/// Les fiches non publiées ne sont visibles que du back-office
pub fn fiche_visible(user: Option<&users::Model>, fiche: &memofiches::Model) -> bool {
    fiche.status == FicheStatus::Published || user.is_some_and(|u| u.role.is_back_office())
}

fn is_locked(
    user: Option<&users::Model>,
    fiche: &memofiches::Model,
    context: &AccessContext,
    now: DateTime<Utc>,
) -> bool {
    if fiche.is_free {
        return false;
    }

    let Some(user) = user else {
        return true;
    };

    if SubscriberRole::from(user.role) == SubscriberRole::BackOffice {
        return false;
    }

    let subscriber = effective_subscriber(user, context);
    if subscription_active(subscriber, now) || trial_active(subscriber, now) {
        return false;
    }

    let assigned = context
        .group
        .resolved()
        .is_some_and(|group| group.assigned_fiches.contains(fiche.id));

    !assigned
}

pub fn resolve_access(
    user: Option<&users::Model>,
    fiche: &memofiches::Model,
    context: &AccessContext,
    now: DateTime<Utc>,
) -> Access {
    Access {
        visible: fiche_visible(user, fiche),
        locked: is_locked(user, fiche, context, now),
    }
}

/// Charge le pharmacien lié, le groupe et le pharmacien référent du groupe.
/// Seules les références utiles au rôle sont lues.
pub async fn load_context(store: &dyn Store, user: Option<&users::Model>) -> Result<AccessContext, StoreError> {
    let Some(user) = user else {
        return Ok(AccessContext::empty());
    };

    let role = SubscriberRole::from(user.role);
    if role == SubscriberRole::BackOffice {
        return Ok(AccessContext::empty());
    }

    let pharmacist = if role.inherits_from_link() {
        link::resolve(user.pharmacist_id, |id| store.find_user(id)).await?
    } else {
        Link::NotLinked
    };

    // Le groupe sert aussi aux fiches assignées, quel que soit le rôle
    let group = link::resolve(user.group_id, |id| store.find_group(id)).await?;

    let group_pharmacist = match (&pharmacist, group.resolved()) {
        (Link::Resolved(_), _) => Link::NotLinked,
        (_, Some(group)) if role.inherits_from_group() => {
            link::resolve(group.first_pharmacist(), |id| store.find_user(id)).await?
        }
        _ => Link::NotLinked,
    };

    if let Link::Unresolved(id) = &pharmacist {
        tracing::debug!(user_id = user.id, pharmacist_id = id, "linked pharmacist not found");
    }
    if let Link::Unresolved(id) = &group {
        tracing::debug!(user_id = user.id, group_id = id, "group not found");
    }

    Ok(AccessContext {
        pharmacist,
        group,
        group_pharmacist,
    })
}
