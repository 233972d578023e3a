mod models;

use crate::api::{CheckedResponse, Client};
use crate::errors::*;
use async_trait::async_trait;
pub use models::*;
use std::borrow::Cow;

#[async_trait]
pub trait ArchiveRestApi {
    async fn get_distributions(&self) -> Result<Vec<Distribution>>;
    async fn create_distribution(&self, request: &CreateDistributionRequest) -> Result<Distribution>;
    async fn get_archives(&self) -> Result<Vec<Archive>>;
    async fn get_archive(&self, id: i32) -> Result<Archive>;
    async fn create_archive(&self, request: &CreateArchiveRequest) -> Result<Archive>;
    async fn get_series(&self) -> Result<Vec<DistroSeries>>;
    async fn create_series(&self, request: &CreateDistroSeriesRequest) -> Result<DistroSeries>;
    async fn get_arch_series(&self) -> Result<Vec<DistroArchSeries>>;
    async fn create_arch_series(
        &self,
        request: &CreateDistroArchSeriesRequest,
    ) -> Result<DistroArchSeries>;
    async fn set_chroot(&self, id: i32, request: &SetChrootRequest) -> Result<DistroArchSeries>;
}

#[async_trait]
pub trait SourceRestApi {
    async fn create_source_release(
        &self,
        request: &CreateSourceReleaseRequest,
    ) -> Result<SourceReleaseCreated>;
    async fn get_source_release(&self, id: i32) -> Result<SourceRelease>;
}

#[async_trait]
pub trait BuildRestApi {
    async fn get_builds(&self, filter: &BuildFilter) -> Result<Vec<Build>>;
    async fn get_build(&self, id: i32) -> Result<Build>;
    async fn get_build_log(&self, id: i32) -> Result<String>;
    async fn get_build_binaries(&self, id: i32) -> Result<Vec<BinaryRelease>>;
    async fn cancel_build(&self, id: i32) -> Result<Build>;
    async fn requeue_build(&self, id: i32) -> Result<Build>;
    async fn dispatch_build(&self, id: i32, request: &DispatchManualRequest) -> Result<Build>;
    async fn rescore_build(&self, id: i32, request: &RescoreRequest) -> Result<QueuedBuild>;
    async fn set_build_manual(&self, id: i32, request: &SetManualRequest) -> Result<QueuedBuild>;
}

#[async_trait]
pub trait QueueRestApi {
    async fn get_queue(&self) -> Result<Vec<QueuedBuild>>;
    async fn run_scheduler(&self) -> Result<()>;
}

#[async_trait]
pub trait BuilderRestApi {
    async fn get_builders(&self) -> Result<Vec<Builder>>;
    async fn get_builder(&self, id: i32) -> Result<Builder>;
    async fn register_builder(&self, request: &RegisterBuilderRequest) -> Result<Builder>;
    async fn reset_builder(&self, id: i32) -> Result<Builder>;
    async fn set_builder_manual(&self, id: i32, request: &SetFlagRequest) -> Result<Builder>;
    async fn set_builder_trusted(&self, id: i32, request: &SetFlagRequest) -> Result<Builder>;
}

#[async_trait]
pub trait PublishingRestApi {
    async fn get_published(&self, query: &ListPublishedQuery) -> Result<Vec<Publication>>;
    async fn get_publication(&self, record: PublicationRef) -> Result<Publication>;
    async fn publish(&self, record: PublicationRef) -> Result<Publication>;
    async fn schedule_removal(
        &self,
        record: PublicationRef,
        request: &ScheduleRemovalRequest,
    ) -> Result<Publication>;
    async fn withdraw(
        &self,
        record: PublicationRef,
        request: &ScheduleRemovalRequest,
    ) -> Result<Publication>;
    async fn lift_embargo(&self, record: PublicationRef) -> Result<Publication>;
    async fn override_publication(
        &self,
        record: PublicationRef,
        request: &OverrideRequest,
    ) -> Result<Publication>;
}

fn publication_path(record: PublicationRef, action: Option<&str>) -> Cow<'static, str> {
    let base = format!("api/v1/publications/{}/{}", record.kind, record.id);
    match action {
        Some(action) => Cow::Owned(format!("{base}/{action}")),
        None => Cow::Owned(base),
    }
}

#[async_trait]
impl ArchiveRestApi for Client {
    async fn get_distributions(&self) -> Result<Vec<Distribution>> {
        let records = self
            .get(Cow::Borrowed("api/v1/distributions"))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(records)
    }

    async fn create_distribution(&self, request: &CreateDistributionRequest) -> Result<Distribution> {
        let record = self
            .post(Cow::Borrowed("api/v1/distributions"))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn get_archives(&self) -> Result<Vec<Archive>> {
        let records = self
            .get(Cow::Borrowed("api/v1/archives"))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(records)
    }

    async fn get_archive(&self, id: i32) -> Result<Archive> {
        let record = self
            .get(Cow::Owned(format!("api/v1/archives/{id}")))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn create_archive(&self, request: &CreateArchiveRequest) -> Result<Archive> {
        let record = self
            .post(Cow::Borrowed("api/v1/archives"))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn get_series(&self) -> Result<Vec<DistroSeries>> {
        let records = self
            .get(Cow::Borrowed("api/v1/series"))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(records)
    }

    async fn create_series(&self, request: &CreateDistroSeriesRequest) -> Result<DistroSeries> {
        let record = self
            .post(Cow::Borrowed("api/v1/series"))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn get_arch_series(&self) -> Result<Vec<DistroArchSeries>> {
        let records = self
            .get(Cow::Borrowed("api/v1/arch-series"))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(records)
    }

    async fn create_arch_series(
        &self,
        request: &CreateDistroArchSeriesRequest,
    ) -> Result<DistroArchSeries> {
        let record = self
            .post(Cow::Borrowed("api/v1/arch-series"))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn set_chroot(&self, id: i32, request: &SetChrootRequest) -> Result<DistroArchSeries> {
        let record = self
            .post(Cow::Owned(format!("api/v1/arch-series/{id}/chroot")))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }
}

#[async_trait]
impl SourceRestApi for Client {
    async fn create_source_release(
        &self,
        request: &CreateSourceReleaseRequest,
    ) -> Result<SourceReleaseCreated> {
        let created = self
            .post(Cow::Borrowed("api/v1/sources"))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(created)
    }

    async fn get_source_release(&self, id: i32) -> Result<SourceRelease> {
        let record = self
            .get(Cow::Owned(format!("api/v1/sources/{id}")))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }
}

#[async_trait]
impl BuildRestApi for Client {
    async fn get_builds(&self, filter: &BuildFilter) -> Result<Vec<Build>> {
        let records = self
            .get(Cow::Borrowed("api/v1/builds"))
            .query(filter)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(records)
    }

    async fn get_build(&self, id: i32) -> Result<Build> {
        let record = self
            .get(Cow::Owned(format!("api/v1/builds/{id}")))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn get_build_log(&self, id: i32) -> Result<String> {
        let data = self
            .get(Cow::Owned(format!("api/v1/builds/{id}/log")))
            .send()
            .await?
            .checked()
            .await?
            .text()
            .await?;

        Ok(data)
    }

    async fn get_build_binaries(&self, id: i32) -> Result<Vec<BinaryRelease>> {
        let records = self
            .get(Cow::Owned(format!("api/v1/builds/{id}/binaries")))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(records)
    }

    async fn cancel_build(&self, id: i32) -> Result<Build> {
        let record = self
            .post(Cow::Owned(format!("api/v1/builds/{id}/cancel")))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn requeue_build(&self, id: i32) -> Result<Build> {
        let record = self
            .post(Cow::Owned(format!("api/v1/builds/{id}/requeue")))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn dispatch_build(&self, id: i32, request: &DispatchManualRequest) -> Result<Build> {
        let record = self
            .post(Cow::Owned(format!("api/v1/builds/{id}/dispatch")))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn rescore_build(&self, id: i32, request: &RescoreRequest) -> Result<QueuedBuild> {
        let record = self
            .post(Cow::Owned(format!("api/v1/builds/{id}/rescore")))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn set_build_manual(&self, id: i32, request: &SetManualRequest) -> Result<QueuedBuild> {
        let record = self
            .post(Cow::Owned(format!("api/v1/builds/{id}/manual")))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }
}

#[async_trait]
impl QueueRestApi for Client {
    async fn get_queue(&self) -> Result<Vec<QueuedBuild>> {
        let records = self
            .get(Cow::Borrowed("api/v1/queue"))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(records)
    }

    async fn run_scheduler(&self) -> Result<()> {
        self.post(Cow::Borrowed("api/v1/queue/run"))
            .send()
            .await?
            .checked()
            .await?;

        Ok(())
    }
}

#[async_trait]
impl BuilderRestApi for Client {
    async fn get_builders(&self) -> Result<Vec<Builder>> {
        let records = self
            .get(Cow::Borrowed("api/v1/builders"))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(records)
    }

    async fn get_builder(&self, id: i32) -> Result<Builder> {
        let record = self
            .get(Cow::Owned(format!("api/v1/builders/{id}")))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn register_builder(&self, request: &RegisterBuilderRequest) -> Result<Builder> {
        let record = self
            .post(Cow::Borrowed("api/v1/builders"))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn reset_builder(&self, id: i32) -> Result<Builder> {
        let record = self
            .post(Cow::Owned(format!("api/v1/builders/{id}/reset")))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn set_builder_manual(&self, id: i32, request: &SetFlagRequest) -> Result<Builder> {
        let record = self
            .post(Cow::Owned(format!("api/v1/builders/{id}/manual")))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn set_builder_trusted(&self, id: i32, request: &SetFlagRequest) -> Result<Builder> {
        let record = self
            .post(Cow::Owned(format!("api/v1/builders/{id}/trusted")))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }
}

#[async_trait]
impl PublishingRestApi for Client {
    async fn get_published(&self, query: &ListPublishedQuery) -> Result<Vec<Publication>> {
        let records = self
            .get(Cow::Borrowed("api/v1/published"))
            .query(query)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(records)
    }

    async fn get_publication(&self, record: PublicationRef) -> Result<Publication> {
        let record = self
            .get(publication_path(record, None))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn publish(&self, record: PublicationRef) -> Result<Publication> {
        let record = self
            .post(publication_path(record, Some("publish")))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn schedule_removal(
        &self,
        record: PublicationRef,
        request: &ScheduleRemovalRequest,
    ) -> Result<Publication> {
        let record = self
            .post(publication_path(record, Some("remove")))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn withdraw(
        &self,
        record: PublicationRef,
        request: &ScheduleRemovalRequest,
    ) -> Result<Publication> {
        let record = self
            .post(publication_path(record, Some("withdraw")))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn lift_embargo(&self, record: PublicationRef) -> Result<Publication> {
        let record = self
            .post(publication_path(record, Some("lift-embargo")))
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }

    async fn override_publication(
        &self,
        record: PublicationRef,
        request: &OverrideRequest,
    ) -> Result<Publication> {
        let record = self
            .post(publication_path(record, Some("override")))
            .json(request)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;

        Ok(record)
    }
}
