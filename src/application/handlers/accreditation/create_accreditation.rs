//! CreateAccreditationHandler - opens a PENDING accreditation request.

use std::sync::Arc;

use crate::domain::accreditation::{
    Accreditation, AccreditationError, AccreditationStateChange, AccreditationType, Document,
    NewAccreditation, User,
};
use crate::domain::foundation::{CommandMetadata, ErrorCode, UserId};
use crate::ports::{AccreditationRepository, AccreditationTransaction};

use super::transition::{finish, infrastructure, write_event};

/// Command to create an accreditation request.
#[derive(Debug, Clone)]
pub struct CreateAccreditationCommand {
    pub user_id: UserId,
    pub accreditation_type: AccreditationType,
    pub document: Document,
}

/// Result of a successful create.
#[derive(Debug, Clone)]
pub struct CreateAccreditationResult {
    pub accreditation: Accreditation,
    pub event: AccreditationStateChange,
}

/// Handler for creating accreditation requests.
pub struct CreateAccreditationHandler {
    repository: Arc<dyn AccreditationRepository>,
}

impl CreateAccreditationHandler {
    pub fn new(repository: Arc<dyn AccreditationRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        cmd: CreateAccreditationCommand,
        metadata: CommandMetadata,
    ) -> Result<CreateAccreditationResult, AccreditationError> {
        cmd.document.validate()?;

        let mut tx = self
            .repository
            .begin()
            .await
            .map_err(infrastructure("begin create"))?;
        let result = create_in(tx.as_mut(), cmd, &metadata).await;
        let result = finish(tx, result).await?;

        tracing::info!(
            accreditation_id = %result.accreditation.id,
            user_id = %result.accreditation.user_id,
            accreditation_type = %result.accreditation.accreditation_type,
            "accreditation created"
        );
        Ok(result)
    }
}

async fn create_in(
    tx: &mut dyn AccreditationTransaction,
    cmd: CreateAccreditationCommand,
    metadata: &CommandMetadata,
) -> Result<CreateAccreditationResult, AccreditationError> {
    let user = get_or_create_user(tx, &cmd.user_id).await?;

    let pending = tx
        .find_pending_by_user(&user.user_id)
        .await
        .map_err(infrastructure("look up pending accreditations"))?;
    if !pending.is_empty() {
        tracing::warn!(user_id = %user.user_id, "user already has a pending accreditation");
        return Err(AccreditationError::already_pending(user.user_id));
    }

    let new = NewAccreditation::new(&user, cmd.accreditation_type, cmd.document);
    let accreditation = match tx.insert(&new).await {
        Ok(accreditation) => accreditation,
        Err(err) if err.code == ErrorCode::Conflict => {
            tracing::warn!(
                user_id = %user.user_id,
                "concurrent create claimed the pending slot first"
            );
            return Err(AccreditationError::already_pending(user.user_id));
        }
        Err(err) => return Err(infrastructure("insert accreditation")(err)),
    };

    let event = AccreditationStateChange::created(accreditation.id, accreditation.to_request());
    write_event(tx, &event, metadata).await?;

    Ok(CreateAccreditationResult {
        accreditation,
        event,
    })
}

/// Finds the user or lazily creates it. A lost insert race re-fetches.
async fn get_or_create_user(
    tx: &mut dyn AccreditationTransaction,
    user_id: &UserId,
) -> Result<User, AccreditationError> {
    if let Some(user) = tx
        .find_user(user_id)
        .await
        .map_err(infrastructure("find user"))?
    {
        return Ok(user);
    }

    if let Some(user) = tx
        .insert_user(user_id)
        .await
        .map_err(infrastructure("insert user"))?
    {
        tracing::debug!(user_id = %user_id, "created user");
        return Ok(user);
    }

    tx.find_user(user_id)
        .await
        .map_err(infrastructure("re-fetch user"))?
        .ok_or_else(|| {
            AccreditationError::internal(format!("user {} vanished after insert conflict", user_id))
        })
}
