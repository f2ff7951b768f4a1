//! Command-line surface.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "qms")]
#[command(about = "File-backed quality management system for controlled documents")]
#[command(version)]
pub struct Cli {
    /// Acting user identity.
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new document
    Create {
        /// Document type (SOP, CR, INV, TP, VAR, TEMPLATE, ...)
        doc_type: String,
        #[arg(long)]
        title: Option<String>,
        /// Parent document ID (required for TP and VAR)
        #[arg(long)]
        parent: Option<String>,
        /// Name for TEMPLATE documents (e.g. CR, SOP)
        #[arg(long)]
        name: Option<String>,
    },
    /// Read a document
    Read {
        doc_id: String,
        /// Read a specific archived version
        #[arg(long, short = 'v')]
        version: Option<String>,
        /// Read the draft version
        #[arg(long)]
        draft: bool,
    },
    /// Check out a document for editing
    Checkout { doc_id: String },
    /// Check in a document from your workspace
    Checkin { doc_id: String },
    /// Route a document for review or approval
    Route {
        doc_id: String,
        #[arg(long)]
        review: bool,
        #[arg(long)]
        approval: bool,
        /// Assignees (defaults to qa)
        #[arg(long, num_args = 1..)]
        assign: Vec<String>,
        /// Route the final approval as a retirement
        #[arg(long)]
        retire: bool,
    },
    /// Add reviewers/approvers to an active workflow (quality only)
    Assign {
        doc_id: String,
        #[arg(long, num_args = 1.., required = true)]
        assignees: Vec<String>,
    },
    /// Submit a review
    Review {
        doc_id: String,
        /// Recommend for approval
        #[arg(long)]
        recommend: bool,
        /// Request updates before approval
        #[arg(long)]
        request_updates: bool,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Approve a document
    Approve { doc_id: String },
    /// Reject a document back to its reviewed state
    Reject {
        doc_id: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Release an executable document for execution
    Release { doc_id: String },
    /// Revert a post-reviewed document back to execution
    Revert {
        doc_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Close an executable document
    Close { doc_id: String },
    /// Permanently delete a never-effective document
    Cancel {
        doc_id: String,
        #[arg(long)]
        confirm: bool,
    },
    /// Administrative repair of an effective/closed document
    Fix { doc_id: String },
    /// Show document status
    Status { doc_id: String },
    /// List your inbox tasks
    Inbox,
    /// List your workspace documents
    Workspace,
    /// Show the full audit history of a document
    History { doc_id: String },
    /// Show review/rejection comments for a document
    Comments {
        doc_id: String,
        #[arg(long, short = 'v')]
        version: Option<String>,
    },
    /// Initialize a new QMS project in the current directory
    Init,
    /// Manage SDLC namespaces
    Namespace {
        #[command(subcommand)]
        action: NamespaceAction,
    },
    /// Manage QMS users
    User {
        /// Register a new user
        #[arg(long)]
        add: Option<String>,
        /// Group for --add (administrator, initiator, quality, reviewer)
        #[arg(long)]
        group: Option<String>,
        /// List known users
        #[arg(long)]
        list: bool,
    },
    /// Synthesize missing metadata and audit records
    Migrate,
    /// Report documents with missing metadata or audit records
    VerifyMigration,
}

#[derive(Subcommand)]
pub enum NamespaceAction {
    /// List registered SDLC namespaces
    List,
    /// Register a new SDLC namespace (administrators only)
    Add { name: String },
}
