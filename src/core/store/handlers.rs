use actix::prelude::*;

use crate::core::error::DownloadResult;
use super::actor::FileStore;
use super::messages::*;

impl Handler<ListFiles> for FileStore {
    type Result = MessageResult<ListFiles>;
    fn handle(&mut self, _msg: ListFiles, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.files.clone())
    }
}

impl Handler<ImportFile> for FileStore {
    type Result = DownloadResult<Option<std::path::PathBuf>>;
    fn handle(&mut self, msg: ImportFile, _ctx: &mut Self::Context) -> Self::Result {
        self.import(msg).inspect_err(|e| self.report(e))
    }
}

impl Handler<DeleteFile> for FileStore {
    type Result = DownloadResult<()>;
    fn handle(&mut self, msg: DeleteFile, _ctx: &mut Self::Context) -> Self::Result {
        self.delete(&msg.path).inspect_err(|e| self.report(e))
    }
}

impl Handler<DeleteAll> for FileStore {
    type Result = DownloadResult<()>;
    fn handle(&mut self, _msg: DeleteAll, _ctx: &mut Self::Context) -> Self::Result {
        self.delete_all().inspect_err(|e| self.report(e))
    }
}

impl Handler<Reconcile> for FileStore {
    type Result = ();
    fn handle(&mut self, _msg: Reconcile, _ctx: &mut Self::Context) {
        self.reconcile();
    }
}

impl Handler<SetForeground> for FileStore {
    type Result = ();
    fn handle(&mut self, msg: SetForeground, ctx: &mut Self::Context) {
        match msg.0 {
            true => {
                self.reconcile();
                if self.timer.is_none() {
                    let handle = ctx.run_interval(self.reconcile_interval(), |act, _ctx| act.reconcile());
                    self.timer = Some(handle);
                    log::debug!("开始定期对齐文件目录");
                }
            }
            false => {
                if let Some(handle) = self.timer.take() {
                    ctx.cancel_future(handle);
                    log::debug!("停止定期对齐文件目录");
                }
            }
        }
    }
}
