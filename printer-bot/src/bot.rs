//! Discord front-end
//!
//! Registers `/print` and `/print-image` in each configured guild and turns
//! every invocation into one print job. Interactions are deferred first,
//! since a print (or an image download) can outlast Discord's three
//! second reply window.

use serenity::all::{
    Attachment, Client, CommandDataOptionValue, CommandInteraction, CommandOptionType, Context,
    CreateCommand, CreateCommandOption, EditInteractionResponse, EventHandler, GatewayIntents,
    GuildId, Interaction, Ready,
};
use serenity::async_trait;
use tracing::{error, info, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::{AppState, jobs};

pub const PRINT_COMMAND: &str = "print";
pub const PRINT_IMAGE_COMMAND: &str = "print-image";

/// `/print text:<string>`
pub fn print_command() -> CreateCommand {
    CreateCommand::new(PRINT_COMMAND)
        .description("Print a message on the receipt printer")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "text", "Text to print")
                .required(true),
        )
}

/// `/print-image image:<attachment>`
pub fn print_image_command() -> CreateCommand {
    CreateCommand::new(PRINT_IMAGE_COMMAND)
        .description("Print an image on the receipt printer")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Attachment, "image", "Image to print")
                .required(true),
        )
}

/// Reply text for a finished `/print`
pub fn message_reply<T>(result: &AppResult<T>) -> String {
    match result {
        Ok(_) => "Printed the message.".to_string(),
        Err(e) => format!("Could not print the message: {}", e),
    }
}

/// Reply text for a finished `/print-image`
pub fn image_reply<T>(result: &AppResult<T>) -> String {
    match result {
        Ok(_) => "Printed the image.".to_string(),
        Err(e) => format!("Could not print the image: {}", e),
    }
}

pub struct Handler {
    state: AppState,
}

impl Handler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    async fn print_text(&self, command: &CommandInteraction) -> String {
        let text = command.data.options.iter().find_map(|opt| match &opt.value {
            CommandDataOptionValue::String(s) if opt.name == "text" => Some(s.clone()),
            _ => None,
        });

        let result = match text {
            Some(text) => jobs::print_message(&self.state.printer, text, true).await,
            None => Err(AppError::bad_request("Missing option 'text'")),
        };
        message_reply(&result)
    }

    async fn print_image(&self, command: &CommandInteraction) -> String {
        let attachment = command.data.options.iter().find_map(|opt| match &opt.value {
            CommandDataOptionValue::Attachment(id) => command.data.resolved.attachments.get(id),
            _ => None,
        });

        let result = match attachment {
            Some(attachment) => self.print_attachment(attachment).await,
            None => Err(AppError::bad_request("Missing option 'image'")),
        };
        image_reply(&result)
    }

    #[instrument(skip(self, attachment), fields(filename = %attachment.filename))]
    async fn print_attachment(&self, attachment: &Attachment) -> AppResult<()> {
        jobs::ensure_image(attachment.content_type.as_deref())?;
        let bytes = jobs::download_image(&self.state.http, &attachment.url).await?;
        jobs::print_image(&self.state.printer, bytes, true).await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "Connected to Discord");

        for &id in &self.state.config.guild_ids {
            let guild = GuildId::new(id);
            match guild
                .set_commands(&ctx, vec![print_command(), print_image_command()])
                .await
            {
                Ok(commands) => info!(guild = id, count = commands.len(), "Registered commands"),
                Err(e) => error!(guild = id, error = %e, "Failed to register commands"),
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        info!(
            command = %command.data.name,
            user = %command.user.name,
            "Slash command received"
        );

        if let Err(e) = command.defer(&ctx).await {
            warn!(error = %e, "Failed to defer interaction");
            return;
        }

        let reply = match command.data.name.as_str() {
            PRINT_COMMAND => self.print_text(&command).await,
            PRINT_IMAGE_COMMAND => self.print_image(&command).await,
            other => format!("Unknown command: {}", other),
        };

        if let Err(e) = command
            .edit_response(&ctx, EditInteractionResponse::new().content(reply))
            .await
        {
            warn!(error = %e, "Failed to send reply");
        }
    }
}

/// Connect to Discord and handle commands until the gateway shuts down
pub async fn run_bot(state: AppState, token: &str) -> anyhow::Result<()> {
    let mut client = Client::builder(token, GatewayIntents::GUILDS)
        .event_handler(Handler::new(state))
        .await?;
    client.start().await?;
    Ok(())
}
