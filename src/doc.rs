use crate::routes::{
    events::models::*, events::*, invitations::models::*, invitations::*, lottery::models::*,
    lottery::*, notifications::models::*, notifications::*, users::*, waitlist::models::*,
    waitlist::*,
};
use crate::utils::events::models::*;
use crate::utils::invitations::models::*;
use crate::utils::notifications::models::*;
use crate::utils::users::models::*;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
info(title = "Eventdraw", description = "Event waiting lists with lottery based invitations", ),
paths(
create_event,
get_events,
get_event,
delete_event,
join_waitlist,
leave_waitlist,
get_waitlist_size,
get_waitlist_locations,
draw_lottery,
complete_lottery,
get_my_invitations,
get_invitation,
accept_invitation,
decline_invitation,
withdraw_invitation,
get_event_invitations,
create_invitations,
stream_invitation_summary,
get_feed,
broadcast,
delete_notification,
get_me,
update_me,
promote_user,
demote_user,
),
components(schemas(
Event,
EventDraft,
EventView,
EventPhase,
EntrantStatus,
InvitationSummary,
EventFilter,
GeoPoint,
WaitlistLocation,
JoinWaitlist,
WaitlistSize,
DrawOutcome,
Invitation,
InvitationState,
CreateInvites,
CreatedInvites,
Notification,
Audience,
BroadcastMessage,
User,
Role,
UserPreferences,
)),
tags((name = "events"),(name = "waitlist"),(name = "lottery"),(name = "invitations"),(name = "notifications"),(name = "users"))
)]
pub struct ApiDoc;
